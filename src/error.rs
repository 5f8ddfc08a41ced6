//! Error types for medprep

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable codes for practice attempt failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ExamNotFound,
    TopicNotFound,
    NoQuestionsAvailable,
    InvalidInput,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ExamNotFound => "exam_not_found",
            ErrorCode::TopicNotFound => "topic_not_found",
            ErrorCode::NoQuestionsAvailable => "no_questions_available",
            ErrorCode::InvalidInput => "invalid_input",
        }
    }
}

/// Failure building a practice attempt
///
/// Every variant except `Store` carries one of the [`ErrorCode`]s. Store
/// failures are passed through unchanged; retrying is the caller's call.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("Exam not found: {0}")]
    ExamNotFound(String),

    #[error("Topic '{topic}' not found in exam '{exam}'")]
    TopicNotFound { exam: String, topic: String },

    #[error("No questions available for this selection")]
    NoQuestionsAvailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StorageError),
}

impl AttemptError {
    /// The tagged code, or `None` for pass-through store failures
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AttemptError::ExamNotFound(_) => Some(ErrorCode::ExamNotFound),
            AttemptError::TopicNotFound { .. } => Some(ErrorCode::TopicNotFound),
            AttemptError::NoQuestionsAvailable => Some(ErrorCode::NoQuestionsAvailable),
            AttemptError::InvalidInput(_) => Some(ErrorCode::InvalidInput),
            AttemptError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_wire_names() {
        let err = AttemptError::TopicNotFound {
            exam: "usmle-step-1".into(),
            topic: "cardio".into(),
        };
        assert_eq!(err.code(), Some(ErrorCode::TopicNotFound));
        assert_eq!(
            serde_json::to_value(ErrorCode::NoQuestionsAvailable).unwrap(),
            serde_json::json!("no_questions_available")
        );
        assert_eq!(ErrorCode::ExamNotFound.as_str(), "exam_not_found");
    }

    #[test]
    fn test_store_errors_have_no_code() {
        let err: AttemptError = StorageError::Database("locked".into()).into();
        assert!(err.code().is_none());
        assert_eq!(err.to_string(), "Database error: locked");
    }
}
