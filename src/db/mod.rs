//! SQLite database module
//!
//! Holds the question bank, per-user mastery marks, practice attempts and
//! stored XP.
//!
//! ## Tables
//!
//! - `exams` - Exams, unique by slug
//! - `topics` - Topics, unique by (exam, slug)
//! - `questions` - Questions, each in one exam, optionally one topic
//! - `question_mastery` - Questions a user has mastered
//! - `practice_attempts` / `practice_attempt_questions` - Attempts and their ordered question lists
//! - `user_progress` - Accumulated XP per user

pub mod attempts;
pub mod catalog;
pub mod progress;
pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StorageError;

/// SQLite database for the question bank and practice data
pub struct PracticeDb {
    conn: Mutex<Connection>,
}

impl PracticeDb {
    /// Open or create the database file
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Database(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent readers
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StorageError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory().map_err(|e| {
            StorageError::Database(format!("Failed to open in-memory SQLite: {}", e))
        })?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.with_conn(schema::init_schema)
    }

    /// Run a read with the shared connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run a write with exclusive access (needed for transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Row counts for the health endpoint
    pub fn stats(&self) -> Result<DbStats, StorageError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, StorageError> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n as u64)
                .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
            };

            Ok(DbStats {
                exam_count: count("exams")?,
                topic_count: count("topics")?,
                question_count: count("questions")?,
                attempt_count: count("practice_attempts")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub exam_count: u64,
    pub topic_count: u64,
    pub question_count: u64,
    pub attempt_count: u64,
}

// Re-exports
pub use catalog::{CatalogImport, ExamSeed, ImportSummary, QuestionSeed, TopicSeed};
pub use progress::XpUpdate;
