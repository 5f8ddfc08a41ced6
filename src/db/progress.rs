//! Stored XP and mastery marks

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::StorageError;

/// XP before and after an award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct XpUpdate {
    pub previous: u64,
    pub current: u64,
}

/// Stored XP for a user (0 if never awarded)
pub fn get_xp(conn: &Connection, user_id: &str) -> Result<u64, StorageError> {
    let xp: Option<i64> = conn
        .query_row(
            "SELECT xp FROM user_progress WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

    Ok(xp.unwrap_or(0).max(0) as u64)
}

/// Add XP to a user, saturating at the storable maximum
pub fn add_xp(conn: &mut Connection, user_id: &str, amount: u64) -> Result<XpUpdate, StorageError> {
    let tx = conn
        .transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    let previous = get_xp(&tx, user_id)?;
    let current = previous.saturating_add(amount).min(i64::MAX as u64);

    tx.execute(
        "INSERT INTO user_progress (user_id, xp, updated_at) VALUES (?, ?, datetime('now'))
         ON CONFLICT(user_id) DO UPDATE SET xp = excluded.xp, updated_at = excluded.updated_at",
        params![user_id, current as i64],
    )
    .map_err(|e| StorageError::Database(format!("Update xp failed: {}", e)))?;

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit xp: {}", e)))?;

    Ok(XpUpdate { previous, current })
}

/// Record that a user mastered a question; false if already recorded
pub fn mark_mastered(
    conn: &Connection,
    user_id: &str,
    question_id: &str,
) -> Result<bool, StorageError> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO question_mastery (user_id, question_id) VALUES (?, ?)",
            params![user_id, question_id],
        )
        .map_err(|e| StorageError::Database(format!("Insert mastery failed: {}", e)))?;

    Ok(inserted > 0)
}
