//! Practice attempt persistence

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::StorageError;
use crate::store::{NewAttempt, PracticeAttempt};

const ATTEMPT_COLUMNS: &str = "a.id, a.user_id, a.exam_id, e.slug AS exam_slug, \
     a.topic_id, t.slug AS topic_slug, a.created_at \
     FROM practice_attempts a \
     JOIN exams e ON e.id = a.exam_id \
     LEFT JOIN topics t ON t.id = a.topic_id";

fn attempt_from_row(row: &Row) -> Result<PracticeAttempt, rusqlite::Error> {
    Ok(PracticeAttempt {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        exam_id: row.get("exam_id")?,
        exam_slug: row.get("exam_slug")?,
        topic_id: row.get("topic_id")?,
        topic_slug: row.get("topic_slug")?,
        question_ids: vec![], // Loaded separately
        created_at: row.get("created_at")?,
    })
}

fn question_ids(conn: &Connection, attempt_id: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT question_id FROM practice_attempt_questions WHERE attempt_id = ? ORDER BY position",
        )
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let ids = stmt
        .query_map(params![attempt_id], |row| row.get(0))
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    Ok(ids)
}

/// Write an attempt and its ordered question list in one transaction
pub fn insert_attempt(
    conn: &mut Connection,
    attempt: NewAttempt,
) -> Result<PracticeAttempt, StorageError> {
    let id = Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();
    let topic_id = attempt.topic.as_ref().map(|t| t.id.clone());

    let tx = conn
        .transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    tx.execute(
        "INSERT INTO practice_attempts (id, user_id, exam_id, topic_id, created_at) VALUES (?, ?, ?, ?, ?)",
        params![id, attempt.user_id, attempt.exam.id, topic_id, created_at],
    )
    .map_err(|e| StorageError::Database(format!("Insert attempt failed: {}", e)))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO practice_attempt_questions (attempt_id, position, question_id) VALUES (?, ?, ?)",
            )
            .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

        for (position, question_id) in attempt.question_ids.iter().enumerate() {
            stmt.execute(params![id, position as i64, question_id])
                .map_err(|e| StorageError::Database(format!("Insert attempt question failed: {}", e)))?;
        }
    }

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit attempt: {}", e)))?;

    Ok(PracticeAttempt {
        id,
        user_id: attempt.user_id,
        exam_id: attempt.exam.id,
        exam_slug: attempt.exam.slug,
        topic_id,
        topic_slug: attempt.topic.map(|t| t.slug),
        question_ids: attempt.question_ids,
        created_at,
    })
}

/// Get one attempt owned by a user
pub fn get_attempt(
    conn: &Connection,
    user_id: &str,
    attempt_id: &str,
) -> Result<Option<PracticeAttempt>, StorageError> {
    let sql = format!("SELECT {} WHERE a.id = ? AND a.user_id = ?", ATTEMPT_COLUMNS);

    let attempt = conn
        .query_row(&sql, params![attempt_id, user_id], attempt_from_row)
        .optional()
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

    match attempt {
        Some(mut attempt) => {
            attempt.question_ids = question_ids(conn, &attempt.id)?;
            Ok(Some(attempt))
        }
        None => Ok(None),
    }
}

/// List a user's attempts, newest first
pub fn list_attempts(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> Result<Vec<PracticeAttempt>, StorageError> {
    let sql = format!(
        "SELECT {} WHERE a.user_id = ? ORDER BY a.created_at DESC, a.rowid DESC LIMIT ?",
        ATTEMPT_COLUMNS
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let mut attempts = stmt
        .query_map(params![user_id, limit as i64], attempt_from_row)
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    for attempt in &mut attempts {
        attempt.question_ids = question_ids(conn, &attempt.id)?;
    }

    Ok(attempts)
}
