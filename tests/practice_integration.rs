//! Practice attempt integration tests
//!
//! Runs the practice and progress services against an on-disk SQLite
//! database, the way the daemon wires them.
//!
//! Run with: cargo test --test practice_integration

use std::collections::HashSet;
use std::sync::Arc;

use medprep::db::{catalog, CatalogImport, ExamSeed, QuestionSeed, TopicSeed};
use medprep::services::{CreateAttemptInput, EventBus, PracticeEvent};
use medprep::store::{EligibilityPolicy, SelectionOrder};
use medprep::{
    ErrorCode, LevelProgress, PracticeDb, PracticeService, ProgressService, SqliteQuestionStore,
};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    db: Arc<PracticeDb>,
    events: Arc<EventBus>,
    practice: PracticeService,
    progress: ProgressService,
}

fn seed() -> CatalogImport {
    let step_one: Vec<QuestionSeed> = (0..30)
        .map(|i| QuestionSeed {
            id: Some(format!("s1-q{i}")),
            topic: if i < 12 { Some("cardio".into()) } else { None },
            prompt: format!("Step 1 question {i}"),
        })
        .collect();

    CatalogImport {
        exams: vec![
            ExamSeed {
                slug: "step-1".into(),
                title: "Step 1".into(),
                topics: vec![TopicSeed {
                    slug: "cardio".into(),
                    title: "Cardiology".into(),
                }],
                questions: step_one,
            },
            ExamSeed {
                slug: "step-2".into(),
                title: "Step 2".into(),
                topics: vec![
                    TopicSeed {
                        slug: "renal".into(),
                        title: "Renal".into(),
                    },
                    TopicSeed {
                        slug: "empty".into(),
                        title: "No questions yet".into(),
                    },
                ],
                questions: vec![QuestionSeed {
                    id: Some("s2-q0".into()),
                    topic: Some("renal".into()),
                    prompt: "Step 2 renal question".into(),
                }],
            },
        ],
    }
}

fn harness(order: SelectionOrder) -> Harness {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(PracticeDb::open(&dir.path().join("medprep.db")).unwrap());
    db.with_conn_mut(|conn| catalog::import_catalog(conn, &seed()))
        .unwrap();

    let policy = EligibilityPolicy {
        order,
        ..Default::default()
    };
    let store = Arc::new(SqliteQuestionStore::new(db.clone(), policy));
    let events = Arc::new(EventBus::new());

    Harness {
        practice: PracticeService::new(store, events.clone()),
        progress: ProgressService::new(db.clone(), events.clone()),
        events,
        db,
        _dir: dir,
    }
}

fn input(exam: &str, topic: Option<&str>, limit: Option<f64>) -> CreateAttemptInput {
    CreateAttemptInput {
        exam_slug: Some(exam.into()),
        topic_slug: topic.map(String::from),
        limit,
    }
}

fn attempt_rows(db: &PracticeDb) -> u64 {
    db.stats().unwrap().attempt_count
}

#[tokio::test]
async fn unknown_exam_is_rejected_without_writes() {
    let h = harness(SelectionOrder::Stable);

    let err = h
        .practice
        .create_attempt("alice", &input("step-9", None, None))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::ExamNotFound));
    assert_eq!(attempt_rows(&h.db), 0);
}

#[tokio::test]
async fn topic_from_another_exam_is_not_found() {
    let h = harness(SelectionOrder::Stable);

    let err = h
        .practice
        .create_attempt("alice", &input("step-1", Some("renal"), None))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::TopicNotFound));
    assert_eq!(attempt_rows(&h.db), 0);
}

#[tokio::test]
async fn oversized_limit_is_capped() {
    let h = harness(SelectionOrder::Stable);

    let attempt = h
        .practice
        .create_attempt("alice", &input("step-1", None, Some(999.0)))
        .await
        .unwrap();

    assert_eq!(attempt.question_ids.len(), 20);
    assert_eq!(attempt.exam_slug, "step-1");
    assert!(attempt.topic_slug.is_none());
}

#[tokio::test]
async fn topic_scoped_attempt_stays_in_topic() {
    let h = harness(SelectionOrder::Stable);

    let attempt = h
        .practice
        .create_attempt("alice", &input("step-1", Some("cardio"), Some(50.0)))
        .await
        .unwrap();

    assert_eq!(attempt.question_ids.len(), 12);
    assert_eq!(attempt.topic_slug.as_deref(), Some("cardio"));
    for id in &attempt.question_ids {
        let n: u32 = id.trim_start_matches("s1-q").parse().unwrap();
        assert!(n < 12, "{id} is outside the cardio topic");
    }
}

#[tokio::test]
async fn empty_pool_persists_nothing() {
    let h = harness(SelectionOrder::Stable);
    let mut rx = h.events.subscribe();

    let err = h
        .practice
        .create_attempt("alice", &input("step-2", Some("empty"), Some(5.0)))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::NoQuestionsAvailable));
    assert_eq!(attempt_rows(&h.db), 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn repeated_calls_create_distinct_attempts() {
    let h = harness(SelectionOrder::Shuffled);

    let first = h
        .practice
        .create_attempt("alice", &input("step-1", None, Some(10.0)))
        .await
        .unwrap();
    let second = h
        .practice
        .create_attempt("alice", &input("step-1", None, Some(10.0)))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    for attempt in [&first, &second] {
        let unique: HashSet<_> = attempt.question_ids.iter().collect();
        assert_eq!(unique.len(), attempt.question_ids.len());
        assert_eq!(attempt.question_ids.len(), 10);
    }
    assert_eq!(attempt_rows(&h.db), 2);
}

#[tokio::test]
async fn attempts_survive_reopen_in_order() {
    let h = harness(SelectionOrder::Stable);

    let created = h
        .practice
        .create_attempt("alice", &input("step-1", Some("cardio"), Some(4.0)))
        .await
        .unwrap();

    let reopened = Arc::new(PracticeDb::open(&h._dir.path().join("medprep.db")).unwrap());
    let store = Arc::new(SqliteQuestionStore::new(
        reopened,
        EligibilityPolicy::default(),
    ));
    let service = PracticeService::new(store, Arc::new(EventBus::new()));

    let fetched = service
        .get_attempt("alice", &created.id)
        .await
        .unwrap()
        .expect("attempt should be stored");
    assert_eq!(fetched.question_ids, created.question_ids);

    assert!(service
        .get_attempt("bob", &created.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn mastered_questions_are_skipped() {
    let h = harness(SelectionOrder::Stable);

    for i in 0..11 {
        assert!(h
            .progress
            .mark_mastered("alice", &format!("s1-q{i}"))
            .unwrap());
    }

    let attempt = h
        .practice
        .create_attempt("alice", &input("step-1", Some("cardio"), Some(20.0)))
        .await
        .unwrap();
    assert_eq!(attempt.question_ids, vec!["s1-q11".to_string()]);

    // Mastery is per user
    let other = h
        .practice
        .create_attempt("bob", &input("step-1", Some("cardio"), Some(20.0)))
        .await
        .unwrap();
    assert_eq!(other.question_ids.len(), 12);
}

#[tokio::test]
async fn fully_mastered_topic_has_no_questions() {
    let h = harness(SelectionOrder::Stable);
    h.progress.mark_mastered("alice", "s2-q0").unwrap();

    let err = h
        .practice
        .create_attempt("alice", &input("step-2", Some("renal"), None))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NoQuestionsAvailable));
}

#[tokio::test]
async fn xp_awards_move_levels() {
    let h = harness(SelectionOrder::Stable);
    let mut rx = h.events.subscribe();

    let first = h.progress.award_xp("alice", 20).unwrap();
    assert!(!first.leveled_up);
    assert_eq!(first.progress.level, 1);

    let second = h.progress.award_xp("alice", 35).unwrap();
    assert!(second.leveled_up);
    assert_eq!(second.progress, LevelProgress::from_xp(55.0));
    assert_eq!(second.progress.level, 3);

    let profile = h.progress.profile("alice").unwrap();
    assert_eq!(profile.progress.xp, 55);

    let mut saw_level = false;
    while let Ok(event) = rx.try_recv() {
        if let PracticeEvent::LevelReached { level, .. } = event {
            assert_eq!(level, 3);
            saw_level = true;
        }
    }
    assert!(saw_level);
}
