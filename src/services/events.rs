//! Event system for practice and progression
//!
//! Services emit events after a write succeeds. Listeners use them for:
//! - Audit logging
//! - Notifications (level-up toasts)
//! - Leaderboard refresh

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Events emitted by services
#[derive(Debug, Clone)]
pub enum PracticeEvent {
    AttemptCreated {
        id: String,
        user_id: String,
        exam_slug: String,
        topic_slug: Option<String>,
        question_count: usize,
    },
    QuestionMastered {
        user_id: String,
        question_id: String,
    },
    XpAwarded {
        user_id: String,
        amount: u64,
        total: u64,
    },
    LevelReached {
        user_id: String,
        previous_level: u32,
        level: u32,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &PracticeEvent);
}

/// Event bus for broadcasting events
pub struct EventBus {
    sender: broadcast::Sender<PracticeEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: PracticeEvent) {
        trace!(event = ?event, "Emitting practice event");
        // no subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PracticeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &PracticeEvent) {
        match event {
            PracticeEvent::AttemptCreated {
                id,
                user_id,
                exam_slug,
                question_count,
                ..
            } => {
                debug!(
                    id = %id,
                    user = %user_id,
                    exam = %exam_slug,
                    questions = question_count,
                    "Practice attempt created"
                );
            }
            PracticeEvent::LevelReached {
                user_id,
                previous_level,
                level,
            } => {
                info!(user = %user_id, from = previous_level, to = level, "Level reached");
            }
            _ => {
                trace!(event = ?event, "Practice event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(PracticeEvent::XpAwarded {
            user_id: "alice".into(),
            amount: 10,
            total: 35,
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            PracticeEvent::XpAwarded { user_id, total, .. } => {
                assert_eq!(user_id, "alice");
                assert_eq!(total, 35);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(PracticeEvent::QuestionMastered {
            user_id: "alice".into(),
            question_id: "q1".into(),
        });
    }
}
