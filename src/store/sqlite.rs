//! SQLite-backed question store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    EligibilityPolicy, ExamRef, NewAttempt, PracticeAttempt, QuestionStore, SelectionOrder,
    SelectionRequest, TopicRef,
};
use crate::db::{attempts, catalog, PracticeDb};
use crate::error::StorageError;

/// Question store reading the local question bank
pub struct SqliteQuestionStore {
    db: Arc<PracticeDb>,
    policy: EligibilityPolicy,
}

impl SqliteQuestionStore {
    pub fn new(db: Arc<PracticeDb>, policy: EligibilityPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }
}

#[async_trait]
impl QuestionStore for SqliteQuestionStore {
    async fn resolve_exam(&self, slug: &str) -> Result<Option<ExamRef>, StorageError> {
        let exam = self.db.with_conn(|conn| catalog::get_exam_by_slug(conn, slug))?;
        Ok(exam.map(|e| ExamRef {
            id: e.id,
            slug: e.slug,
        }))
    }

    async fn resolve_topic(
        &self,
        exam_id: &str,
        slug: &str,
    ) -> Result<Option<TopicRef>, StorageError> {
        let topic = self
            .db
            .with_conn(|conn| catalog::get_topic(conn, exam_id, slug))?;
        Ok(topic.map(|t| TopicRef {
            id: t.id,
            exam_id: t.exam_id,
            slug: t.slug,
        }))
    }

    async fn select_eligible(
        &self,
        request: &SelectionRequest,
    ) -> Result<Vec<String>, StorageError> {
        let limit = self.policy.batch_size(request.limit) as u32;
        let filter = catalog::QuestionFilter {
            user_id: &request.user_id,
            exam_id: &request.exam_id,
            topic_id: request.topic_id.as_deref(),
            exclude_mastered: self.policy.exclude_mastered,
            shuffled: self.policy.order == SelectionOrder::Shuffled,
            limit,
        };

        let ids = self
            .db
            .with_conn(|conn| catalog::select_question_ids(conn, &filter))?;

        debug!(
            exam_id = %request.exam_id,
            topic_id = ?request.topic_id,
            limit,
            selected = ids.len(),
            "Selected eligible questions"
        );

        Ok(ids)
    }

    async fn record_attempt(&self, attempt: NewAttempt) -> Result<PracticeAttempt, StorageError> {
        self.db
            .with_conn_mut(|conn| attempts::insert_attempt(conn, attempt))
    }

    async fn get_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<PracticeAttempt>, StorageError> {
        self.db
            .with_conn(|conn| attempts::get_attempt(conn, user_id, attempt_id))
    }

    async fn list_attempts(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<PracticeAttempt>, StorageError> {
        self.db
            .with_conn(|conn| attempts::list_attempts(conn, user_id, limit))
    }
}
