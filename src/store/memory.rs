//! In-memory question store
//!
//! Fixture-backed store for tests and local demos. Applies the same
//! eligibility policy as the SQLite store and records every selection
//! request so tests can inspect what actually reached the store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    EligibilityPolicy, ExamRef, NewAttempt, PracticeAttempt, QuestionStore, SelectionRequest,
    TopicRef,
};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct FixtureQuestion {
    id: String,
    exam_id: String,
    topic_id: Option<String>,
}

#[derive(Debug, Default)]
struct Fixture {
    exams: HashMap<String, ExamRef>,
    topics: Vec<TopicRef>,
    questions: Vec<FixtureQuestion>,
    mastered: HashSet<(String, String)>,
    attempts: Vec<PracticeAttempt>,
    scripted: Option<Vec<String>>,
    selections: Vec<SelectionRequest>,
}

/// Question store held entirely in memory
pub struct InMemoryQuestionStore {
    state: RwLock<Fixture>,
    policy: EligibilityPolicy,
}

impl InMemoryQuestionStore {
    pub fn new(policy: EligibilityPolicy) -> Self {
        Self {
            state: RwLock::new(Fixture::default()),
            policy,
        }
    }

    /// Add an exam; its id is derived from the slug
    pub async fn add_exam(&self, slug: &str) -> ExamRef {
        let exam = ExamRef {
            id: format!("exam-{}", slug),
            slug: slug.to_string(),
        };
        self.state
            .write()
            .await
            .exams
            .insert(slug.to_string(), exam.clone());
        exam
    }

    /// Add a topic under an existing exam
    pub async fn add_topic(&self, exam_slug: &str, slug: &str) -> Result<TopicRef, StorageError> {
        let mut state = self.state.write().await;
        let exam = state
            .exams
            .get(exam_slug)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("exam {}", exam_slug)))?;

        let topic = TopicRef {
            id: format!("topic-{}-{}", exam_slug, slug),
            exam_id: exam.id,
            slug: slug.to_string(),
        };
        state.topics.push(topic.clone());
        Ok(topic)
    }

    /// Add a question to an exam, optionally tagged with one of its topics
    pub async fn add_question(
        &self,
        exam_slug: &str,
        topic_slug: Option<&str>,
        id: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let exam_id = state
            .exams
            .get(exam_slug)
            .map(|e| e.id.clone())
            .ok_or_else(|| StorageError::NotFound(format!("exam {}", exam_slug)))?;

        let topic_id = match topic_slug {
            Some(slug) => Some(
                state
                    .topics
                    .iter()
                    .find(|t| t.exam_id == exam_id && t.slug == slug)
                    .map(|t| t.id.clone())
                    .ok_or_else(|| StorageError::NotFound(format!("topic {}", slug)))?,
            ),
            None => None,
        };

        state.questions.push(FixtureQuestion {
            id: id.to_string(),
            exam_id,
            topic_id,
        });
        Ok(())
    }

    /// Mark a question as mastered by a user
    pub async fn mark_mastered(&self, user_id: &str, question_id: &str) {
        self.state
            .write()
            .await
            .mastered
            .insert((user_id.to_string(), question_id.to_string()));
    }

    /// Bypass the policy and answer every selection with exactly `ids`
    pub async fn script_selection(&self, ids: Vec<String>) {
        self.state.write().await.scripted = Some(ids);
    }

    /// Selection requests received so far, oldest first
    pub async fn selections(&self) -> Vec<SelectionRequest> {
        self.state.read().await.selections.clone()
    }

    /// Number of persisted attempts
    pub async fn attempt_count(&self) -> usize {
        self.state.read().await.attempts.len()
    }
}

impl Default for InMemoryQuestionStore {
    fn default() -> Self {
        Self::new(EligibilityPolicy::default())
    }
}

#[async_trait]
impl QuestionStore for InMemoryQuestionStore {
    async fn resolve_exam(&self, slug: &str) -> Result<Option<ExamRef>, StorageError> {
        Ok(self.state.read().await.exams.get(slug).cloned())
    }

    async fn resolve_topic(
        &self,
        exam_id: &str,
        slug: &str,
    ) -> Result<Option<TopicRef>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .topics
            .iter()
            .find(|t| t.exam_id == exam_id && t.slug == slug)
            .cloned())
    }

    async fn select_eligible(
        &self,
        request: &SelectionRequest,
    ) -> Result<Vec<String>, StorageError> {
        let mut state = self.state.write().await;
        state.selections.push(request.clone());

        if let Some(ref scripted) = state.scripted {
            return Ok(scripted.clone());
        }

        let candidates: Vec<String> = state
            .questions
            .iter()
            .filter(|q| q.exam_id == request.exam_id)
            .filter(|q| match request.topic_id {
                Some(ref topic_id) => q.topic_id.as_ref() == Some(topic_id),
                None => true,
            })
            .filter(|q| {
                !self.policy.exclude_mastered
                    || !state
                        .mastered
                        .contains(&(request.user_id.clone(), q.id.clone()))
            })
            .map(|q| q.id.clone())
            .collect();

        Ok(self
            .policy
            .arrange(candidates, self.policy.batch_size(request.limit)))
    }

    async fn record_attempt(&self, attempt: NewAttempt) -> Result<PracticeAttempt, StorageError> {
        let record = PracticeAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: attempt.user_id,
            exam_id: attempt.exam.id,
            exam_slug: attempt.exam.slug,
            topic_id: attempt.topic.as_ref().map(|t| t.id.clone()),
            topic_slug: attempt.topic.map(|t| t.slug),
            question_ids: attempt.question_ids,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.state.write().await.attempts.push(record.clone());
        Ok(record)
    }

    async fn get_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<PracticeAttempt>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .iter()
            .find(|a| a.id == attempt_id && a.user_id == user_id)
            .cloned())
    }

    async fn list_attempts(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<PracticeAttempt>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SelectionOrder;

    fn stable() -> InMemoryQuestionStore {
        InMemoryQuestionStore::new(EligibilityPolicy {
            order: SelectionOrder::Stable,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_topic_scoped_to_exam() {
        let store = stable();
        let step1 = store.add_exam("step-1").await;
        let step2 = store.add_exam("step-2").await;
        store.add_topic("step-2", "renal").await.unwrap();

        assert!(store.resolve_topic(&step1.id, "renal").await.unwrap().is_none());
        assert!(store.resolve_topic(&step2.id, "renal").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mastered_questions_excluded() {
        let store = stable();
        let exam = store.add_exam("step-1").await;
        for id in ["q1", "q2", "q3"] {
            store.add_question("step-1", None, id).await.unwrap();
        }
        store.mark_mastered("alice", "q2").await;

        let request = SelectionRequest {
            user_id: "alice".into(),
            exam_id: exam.id.clone(),
            topic_id: None,
            limit: Some(5),
        };
        assert_eq!(store.select_eligible(&request).await.unwrap(), vec!["q1", "q3"]);

        let other_user = SelectionRequest {
            user_id: "bob".into(),
            ..request
        };
        assert_eq!(store.select_eligible(&other_user).await.unwrap().len(), 3);
        assert_eq!(store.selections().await.len(), 2);
    }

    #[tokio::test]
    async fn test_list_attempts_newest_first() {
        let store = stable();
        let exam = store.add_exam("step-1").await;
        for ids in [vec!["a".to_string()], vec!["b".to_string()]] {
            store
                .record_attempt(NewAttempt {
                    user_id: "alice".into(),
                    exam: exam.clone(),
                    topic: None,
                    question_ids: ids,
                })
                .await
                .unwrap();
        }

        let listed = store.list_attempts("alice", 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].question_ids, vec!["b"]);
        assert!(store.list_attempts("bob", 10).await.unwrap().is_empty());
    }
}
