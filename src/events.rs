//! The subscribable event stream.
//!
//! A thin wrapper over `tokio::sync::broadcast`, the same fan-out primitive the
//! teacher uses for its `DataDistributor` (`app_actor.rs`). Events are published
//! synchronously, inside the executor's single task, immediately after the durable
//! journal write for the same transition — so journal order and event-emission order
//! are the same total order by construction.

use crate::journal::entry::JournalCategory;
use crate::model::state::{Trigger, WorkflowState};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StateChanged {
        transition_id: Uuid,
        from: WorkflowState,
        to: WorkflowState,
        trigger: Trigger,
        timestamp: DateTime<Utc>,
    },
    ExposureTriggered {
        study_instance_uid: String,
    },
    ExposureCompleted {
        study_instance_uid: String,
    },
    ImageRejected {
        study_instance_uid: String,
        reason: String,
    },
    OperatorNotification {
        message: String,
        category: JournalCategory,
    },
    Error {
        message: String,
    },
}

/// Broadcast publisher/subscriber handle for [`WorkflowEvent`]s.
#[derive(Clone)]
pub struct WorkflowEventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. A publish failure (no subscribers) is logged but must
    /// never roll back the state change that already happened.
    pub fn publish(&self, event: WorkflowEvent) {
        if self.sender.send(event).is_err() {
            warn!("workflow event published with no active subscribers");
        }
    }
}

impl Default for WorkflowEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = WorkflowEventBus::default();
        bus.publish(WorkflowEvent::Error {
            message: "no one is listening".into(),
        });
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = WorkflowEventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(WorkflowEvent::ExposureTriggered {
            study_instance_uid: "uid".into(),
        });
        let event = rx.recv().await.expect("event delivered");
        matches!(event, WorkflowEvent::ExposureTriggered { .. });
    }
}
