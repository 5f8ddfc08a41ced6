//! Service layer for medprep
//!
//! Services hold the business rules between HTTP handlers and storage:
//! - Input validation
//! - Orchestration of store lookups and writes
//! - Event emission
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (business logic)
//!     ↓
//! QuestionStore / db/*.rs
//!     ↓
//! SQLite Database
//! ```

pub mod events;
pub mod practice_service;
pub mod progress_service;
pub mod response;

// Re-exports
pub use events::{EventBus, EventListener, PracticeEvent};
pub use practice_service::{CreateAttemptInput, PracticeService};
pub use progress_service::{ProgressService, UserProgress, XpAward};

use std::sync::Arc;

use crate::config::Config;
use crate::db::PracticeDb;
use crate::store::{QuestionStore, SqliteQuestionStore};

/// Service container handed to the HTTP server
pub struct Services {
    pub practice: Arc<PracticeService>,
    pub progress: Arc<ProgressService>,
    pub events: Arc<EventBus>,
    pub db: Arc<PracticeDb>,
}

impl Services {
    /// Wire all services onto one database
    pub fn new(db: Arc<PracticeDb>, config: &Config) -> Self {
        let events = Arc::new(EventBus::new());
        let store: Arc<dyn QuestionStore> =
            Arc::new(SqliteQuestionStore::new(db.clone(), config.policy()));

        Self {
            practice: Arc::new(
                PracticeService::new(store, events.clone())
                    .with_max_questions(config.max_attempt_questions),
            ),
            progress: Arc::new(ProgressService::new(db.clone(), events.clone())),
            events,
            db,
        }
    }
}
