//! Practice service - builds practice attempts
//!
//! Validates the request, resolves exam and topic through the question store,
//! asks the store for eligible questions and persists the attempt. Which
//! questions are eligible, and in what order, is entirely the store's call.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::MAX_ATTEMPT_QUESTIONS;
use crate::error::AttemptError;
use crate::store::{NewAttempt, PracticeAttempt, QuestionStore, SelectionRequest};

use super::events::{EventBus, PracticeEvent};

/// Default and maximum page size for attempt listings
const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

/// Raw request body for creating an attempt
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptInput {
    #[serde(default)]
    pub exam_slug: Option<String>,
    #[serde(default)]
    pub topic_slug: Option<String>,
    #[serde(default)]
    pub limit: Option<f64>,
}

/// Request after validation, before any store access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAttempt {
    pub user_id: String,
    pub exam_slug: String,
    pub topic_slug: Option<String>,
    pub limit: Option<u32>,
}

/// Validate and normalize a create request
pub fn validate_attempt(
    user_id: &str,
    input: &CreateAttemptInput,
    max_questions: u32,
) -> Result<ValidatedAttempt, AttemptError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AttemptError::InvalidInput("user id is required".into()));
    }

    let exam_slug = input
        .exam_slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AttemptError::InvalidInput("examSlug is required".into()))?;

    let topic_slug = match input.topic_slug.as_deref().map(str::trim) {
        Some("") => {
            return Err(AttemptError::InvalidInput(
                "topicSlug must not be empty".into(),
            ))
        }
        other => other.map(str::to_string),
    };

    let limit = input
        .limit
        .map(|limit| normalize_limit(limit, max_questions))
        .transpose()?;

    Ok(ValidatedAttempt {
        user_id: user_id.to_string(),
        exam_slug: exam_slug.to_string(),
        topic_slug,
        limit,
    })
}

/// Round a requested limit and clamp it to `[1, max_questions]`
pub fn normalize_limit(limit: f64, max_questions: u32) -> Result<u32, AttemptError> {
    if !limit.is_finite() || limit <= 0.0 {
        return Err(AttemptError::InvalidInput(format!(
            "limit must be a positive number, got {}",
            limit
        )));
    }

    let rounded = limit.round().min(max_questions as f64);
    Ok((rounded as u32).clamp(1, max_questions.max(1)))
}

/// Drop repeated ids, keeping first occurrences in order
fn dedupe(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Practice attempt service
pub struct PracticeService {
    store: Arc<dyn QuestionStore>,
    events: Arc<EventBus>,
    max_questions: u32,
}

impl PracticeService {
    pub fn new(store: Arc<dyn QuestionStore>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            events,
            max_questions: MAX_ATTEMPT_QUESTIONS,
        }
    }

    /// Override the per-attempt question cap
    pub fn with_max_questions(mut self, max_questions: u32) -> Self {
        self.max_questions = max_questions.max(1);
        self
    }

    pub fn max_questions(&self) -> u32 {
        self.max_questions
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create a new practice attempt for `user_id`
    ///
    /// Nothing is written unless every lookup succeeded and at least one
    /// question was selected.
    pub async fn create_attempt(
        &self,
        user_id: &str,
        input: &CreateAttemptInput,
    ) -> Result<PracticeAttempt, AttemptError> {
        let request = validate_attempt(user_id, input, self.max_questions).map_err(|e| {
            warn!(user = %user_id, error = %e, "Rejected practice attempt request");
            e
        })?;

        let exam = self
            .store
            .resolve_exam(&request.exam_slug)
            .await?
            .ok_or_else(|| AttemptError::ExamNotFound(request.exam_slug.clone()))?;

        let topic = match request.topic_slug {
            Some(ref slug) => Some(
                self.store
                    .resolve_topic(&exam.id, slug)
                    .await?
                    .ok_or_else(|| AttemptError::TopicNotFound {
                        exam: exam.slug.clone(),
                        topic: slug.clone(),
                    })?,
            ),
            None => None,
        };

        let selection = SelectionRequest {
            user_id: request.user_id.clone(),
            exam_id: exam.id.clone(),
            topic_id: topic.as_ref().map(|t| t.id.clone()),
            limit: request.limit,
        };

        let mut question_ids = dedupe(self.store.select_eligible(&selection).await?);
        question_ids.truncate(request.limit.unwrap_or(self.max_questions) as usize);

        if question_ids.is_empty() {
            return Err(AttemptError::NoQuestionsAvailable);
        }

        let attempt = self
            .store
            .record_attempt(NewAttempt {
                user_id: request.user_id,
                exam,
                topic,
                question_ids,
            })
            .await?;

        info!(
            id = %attempt.id,
            user = %attempt.user_id,
            exam = %attempt.exam_slug,
            questions = attempt.question_ids.len(),
            "Practice attempt created"
        );

        self.events.emit(PracticeEvent::AttemptCreated {
            id: attempt.id.clone(),
            user_id: attempt.user_id.clone(),
            exam_slug: attempt.exam_slug.clone(),
            topic_slug: attempt.topic_slug.clone(),
            question_count: attempt.question_ids.len(),
        });

        Ok(attempt)
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get one of the user's own attempts
    pub async fn get_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<PracticeAttempt>, AttemptError> {
        Ok(self.store.get_attempt(user_id, attempt_id).await?)
    }

    /// List the user's attempts, newest first
    pub async fn list_attempts(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<PracticeAttempt>, AttemptError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        Ok(self.store.list_attempts(user_id, limit).await?)
    }
}
