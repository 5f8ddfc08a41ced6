//! Question store abstraction
//!
//! The practice selector never touches the database directly. It talks to a
//! [`QuestionStore`], which owns slug resolution, the eligibility policy and
//! attempt persistence.
//!
//! ```text
//! PracticeService (validation, dedupe, errors)
//!     ↓
//! QuestionStore (resolve / select / record)
//!     ↓
//! InMemoryQuestionStore | SqliteQuestionStore
//! ```

pub mod memory;
pub mod policy;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub use memory::InMemoryQuestionStore;
pub use policy::{EligibilityPolicy, SelectionOrder};
pub use sqlite::SqliteQuestionStore;

/// Resolved exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRef {
    pub id: String,
    pub slug: String,
}

/// Resolved topic, always scoped to one exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    pub id: String,
    pub exam_id: String,
    pub slug: String,
}

/// Constraints passed through to the store's eligibility policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub user_id: String,
    pub exam_id: String,
    pub topic_id: Option<String>,
    /// Already validated and capped; `None` means "use the store default"
    pub limit: Option<u32>,
}

/// Attempt ready to be written
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: String,
    pub exam: ExamRef,
    pub topic: Option<TopicRef>,
    pub question_ids: Vec<String>,
}

/// Persisted practice attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAttempt {
    pub id: String,
    pub user_id: String,
    pub exam_id: String,
    pub exam_slug: String,
    pub topic_id: Option<String>,
    pub topic_slug: Option<String>,
    pub question_ids: Vec<String>,
    pub created_at: String,
}

/// Backing store for practice attempts.
///
/// Implementations decide which questions are eligible and in what order;
/// callers only pass constraints through.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Look up an exam by its slug.
    async fn resolve_exam(&self, slug: &str) -> Result<Option<ExamRef>, StorageError>;

    /// Look up a topic by slug within one exam.
    ///
    /// A slug that only exists under another exam resolves to `None`.
    async fn resolve_topic(
        &self,
        exam_id: &str,
        slug: &str,
    ) -> Result<Option<TopicRef>, StorageError>;

    /// Pick up to `limit` eligible question ids, in attempt order.
    async fn select_eligible(
        &self,
        request: &SelectionRequest,
    ) -> Result<Vec<String>, StorageError>;

    /// Persist a new attempt.
    async fn record_attempt(&self, attempt: NewAttempt) -> Result<PracticeAttempt, StorageError>;

    /// Fetch one attempt owned by `user_id`.
    async fn get_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<PracticeAttempt>, StorageError>;

    /// Most recent attempts for a user, newest first.
    async fn list_attempts(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<PracticeAttempt>, StorageError>;
}
