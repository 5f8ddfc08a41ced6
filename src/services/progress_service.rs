//! Progress service - stored XP run through the level engine

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::db::{catalog, progress, PracticeDb};
use crate::error::StorageError;
use crate::level::{level_from_xp, LevelProgress};

use super::events::{EventBus, PracticeEvent};

/// A user's XP with its level breakdown
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub progress: LevelProgress,
}

/// Result of awarding XP
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAward {
    pub user_id: String,
    pub amount: u64,
    pub previous_level: u32,
    pub leveled_up: bool,
    pub progress: LevelProgress,
}

/// Progress service
pub struct ProgressService {
    db: Arc<PracticeDb>,
    events: Arc<EventBus>,
}

impl ProgressService {
    pub fn new(db: Arc<PracticeDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Current XP and level for a user
    pub fn profile(&self, user_id: &str) -> Result<UserProgress, StorageError> {
        let user_id = require_user(user_id)?;
        let xp = self.db.with_conn(|conn| progress::get_xp(conn, user_id))?;

        Ok(UserProgress {
            user_id: user_id.to_string(),
            progress: LevelProgress::from_xp(xp as f64),
        })
    }

    /// Add XP and report whether a new level was reached
    pub fn award_xp(&self, user_id: &str, amount: i64) -> Result<XpAward, StorageError> {
        let user_id = require_user(user_id)?;
        if amount <= 0 {
            return Err(StorageError::InvalidInput(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        let amount = amount as u64;

        let update = self
            .db
            .with_conn_mut(|conn| progress::add_xp(conn, user_id, amount))?;

        let previous_level = level_from_xp(update.previous as f64);
        let progress = LevelProgress::from_xp(update.current as f64);
        let leveled_up = progress.level > previous_level;

        debug!(
            user = %user_id,
            amount,
            total = update.current,
            level = progress.level,
            "XP awarded"
        );

        self.events.emit(PracticeEvent::XpAwarded {
            user_id: user_id.to_string(),
            amount,
            total: update.current,
        });

        if leveled_up {
            self.events.emit(PracticeEvent::LevelReached {
                user_id: user_id.to_string(),
                previous_level,
                level: progress.level,
            });
        }

        Ok(XpAward {
            user_id: user_id.to_string(),
            amount,
            previous_level,
            leveled_up,
            progress,
        })
    }

    /// Record a mastered question so future attempts can skip it
    pub fn mark_mastered(&self, user_id: &str, question_id: &str) -> Result<bool, StorageError> {
        let user_id = require_user(user_id)?;
        let question_id = question_id.trim();
        if question_id.is_empty() {
            return Err(StorageError::InvalidInput("questionId is required".into()));
        }

        let inserted = self.db.with_conn(|conn| {
            if !catalog::question_exists(conn, question_id)? {
                return Err(StorageError::NotFound(format!("question {}", question_id)));
            }
            progress::mark_mastered(conn, user_id, question_id)
        })?;

        if inserted {
            self.events.emit(PracticeEvent::QuestionMastered {
                user_id: user_id.to_string(),
                question_id: question_id.to_string(),
            });
        }

        Ok(inserted)
    }
}

fn require_user(user_id: &str) -> Result<&str, StorageError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(StorageError::InvalidInput("user id is required".into()));
    }
    Ok(user_id)
}
