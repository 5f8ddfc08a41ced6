//! Exam, topic and question operations
//!
//! The question bank is maintained elsewhere (admin screens); this module
//! only reads it for selection and offers a JSON seed import for local
//! setups and tests.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StorageError;

/// Exam row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRow {
    pub id: String,
    pub slug: String,
    pub title: String,
}

impl ExamRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            slug: row.get("slug")?,
            title: row.get("title")?,
        })
    }
}

/// Topic row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRow {
    pub id: String,
    pub exam_id: String,
    pub slug: String,
    pub title: String,
}

impl TopicRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            exam_id: row.get("exam_id")?,
            slug: row.get("slug")?,
            title: row.get("title")?,
        })
    }
}

/// Filter for picking question ids
#[derive(Debug, Clone)]
pub struct QuestionFilter<'a> {
    pub user_id: &'a str,
    pub exam_id: &'a str,
    pub topic_id: Option<&'a str>,
    pub exclude_mastered: bool,
    pub shuffled: bool,
    pub limit: u32,
}

/// Get exam by slug
pub fn get_exam_by_slug(conn: &Connection, slug: &str) -> Result<Option<ExamRow>, StorageError> {
    conn.query_row(
        "SELECT id, slug, title FROM exams WHERE slug = ?",
        params![slug],
        ExamRow::from_row,
    )
    .optional()
    .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// Get topic by slug within one exam
pub fn get_topic(
    conn: &Connection,
    exam_id: &str,
    slug: &str,
) -> Result<Option<TopicRow>, StorageError> {
    conn.query_row(
        "SELECT id, exam_id, slug, title FROM topics WHERE exam_id = ? AND slug = ?",
        params![exam_id, slug],
        TopicRow::from_row,
    )
    .optional()
    .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// Check whether a question exists
pub fn question_exists(conn: &Connection, id: &str) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?)",
        params![id],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// Select question ids matching the filter, ordered and limited
pub fn select_question_ids(
    conn: &Connection,
    filter: &QuestionFilter,
) -> Result<Vec<String>, StorageError> {
    let mut sql = String::from("SELECT q.id FROM questions q WHERE q.exam_id = ?");
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(filter.exam_id.to_string())];

    if let Some(topic_id) = filter.topic_id {
        sql.push_str(" AND q.topic_id = ?");
        params.push(Box::new(topic_id.to_string()));
    }

    if filter.exclude_mastered {
        sql.push_str(
            " AND q.id NOT IN (SELECT m.question_id FROM question_mastery m WHERE m.user_id = ?)",
        );
        params.push(Box::new(filter.user_id.to_string()));
    }

    if filter.shuffled {
        sql.push_str(" ORDER BY RANDOM()");
    } else {
        sql.push_str(" ORDER BY q.seq");
    }

    sql.push_str(" LIMIT ?");
    params.push(Box::new(filter.limit as i64));

    debug!("Executing query: {}", sql);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let ids = stmt
        .query_map(param_refs.as_slice(), |row| row.get(0))
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    Ok(ids)
}

// ============================================================================
// Seed import
// ============================================================================

/// Seed file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogImport {
    #[serde(default)]
    pub exams: Vec<ExamSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamSeed {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<TopicSeed>,
    #[serde(default)]
    pub questions: Vec<QuestionSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicSeed {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSeed {
    #[serde(default)]
    pub id: Option<String>,
    /// Topic slug within the same exam
    #[serde(default)]
    pub topic: Option<String>,
    pub prompt: String,
}

/// Counts of rows written by an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub exams: u64,
    pub topics: u64,
    pub questions: u64,
}

/// Upsert an exam by slug, returning the stored row
pub fn upsert_exam(conn: &Connection, slug: &str, title: &str) -> Result<ExamRow, StorageError> {
    conn.execute(
        "INSERT INTO exams (id, slug, title) VALUES (?, ?, ?)
         ON CONFLICT(slug) DO UPDATE SET title = excluded.title",
        params![Uuid::new_v4().to_string(), slug, title],
    )
    .map_err(|e| StorageError::Database(format!("Insert exam failed: {}", e)))?;

    get_exam_by_slug(conn, slug)?
        .ok_or_else(|| StorageError::Internal(format!("exam {} vanished after upsert", slug)))
}

/// Upsert a topic by (exam, slug), returning the stored row
pub fn upsert_topic(
    conn: &Connection,
    exam_id: &str,
    slug: &str,
    title: &str,
) -> Result<TopicRow, StorageError> {
    conn.execute(
        "INSERT INTO topics (id, exam_id, slug, title) VALUES (?, ?, ?, ?)
         ON CONFLICT(exam_id, slug) DO UPDATE SET title = excluded.title",
        params![Uuid::new_v4().to_string(), exam_id, slug, title],
    )
    .map_err(|e| StorageError::Database(format!("Insert topic failed: {}", e)))?;

    get_topic(conn, exam_id, slug)?
        .ok_or_else(|| StorageError::Internal(format!("topic {} vanished after upsert", slug)))
}

/// Insert a question; returns false if the id already exists
pub fn insert_question(
    conn: &Connection,
    id: &str,
    exam_id: &str,
    topic_id: Option<&str>,
    prompt: &str,
) -> Result<bool, StorageError> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO questions (id, exam_id, topic_id, prompt) VALUES (?, ?, ?, ?)",
            params![id, exam_id, topic_id, prompt],
        )
        .map_err(|e| StorageError::Database(format!("Insert question failed: {}", e)))?;

    Ok(inserted > 0)
}

/// Import a catalog in one transaction
pub fn import_catalog(
    conn: &mut Connection,
    catalog: &CatalogImport,
) -> Result<ImportSummary, StorageError> {
    let tx = conn
        .transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    let mut summary = ImportSummary::default();

    for exam_seed in &catalog.exams {
        if exam_seed.slug.trim().is_empty() {
            return Err(StorageError::InvalidInput("exam slug is required".into()));
        }

        let exam = upsert_exam(&tx, &exam_seed.slug, &exam_seed.title)?;
        summary.exams += 1;

        for topic_seed in &exam_seed.topics {
            upsert_topic(&tx, &exam.id, &topic_seed.slug, &topic_seed.title)?;
            summary.topics += 1;
        }

        for question in &exam_seed.questions {
            let topic_id = match question.topic {
                Some(ref slug) => Some(
                    get_topic(&tx, &exam.id, slug)?
                        .ok_or_else(|| {
                            StorageError::InvalidInput(format!(
                                "question references unknown topic '{}' in exam '{}'",
                                slug, exam.slug
                            ))
                        })?
                        .id,
                ),
                None => None,
            };

            let id = question
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            if insert_question(&tx, &id, &exam.id, topic_id.as_deref(), &question.prompt)? {
                summary.questions += 1;
            }
        }
    }

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit import: {}", e)))?;

    info!(
        exams = summary.exams,
        topics = summary.topics,
        questions = summary.questions,
        "Catalog imported"
    );

    Ok(summary)
}
