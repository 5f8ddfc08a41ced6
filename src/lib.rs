//! Medprep - XP progression and practice attempts
//!
//! Sidecar for the medprep learning platform. The web application owns
//! sessions, rendering and admin screens; this crate owns the two pieces
//! with real rules in them:
//!
//! - **Level engine** ([`level`]): experience points to level and progress,
//!   over a fixed quadratic cost curve.
//! - **Practice attempts** ([`services::PracticeService`]): a bounded,
//!   ordered, duplicate-free batch of questions for one user and exam,
//!   drawn from a [`store::QuestionStore`].
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/medprep/
//! ├── medprep.db        # SQLite: question bank, attempts, XP, mastery
//! └── config.toml       # Configuration
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod level;
pub mod services;
pub mod store;

// Re-exports
pub use config::Config;
pub use db::PracticeDb;
pub use error::{AttemptError, ErrorCode, StorageError};
pub use http::HttpServer;
pub use level::{level_from_xp, xp_to_next, LevelProgress, MAX_LEVEL};
pub use services::{PracticeService, ProgressService, Services};
pub use store::{InMemoryQuestionStore, PracticeAttempt, QuestionStore, SqliteQuestionStore};
