//! The durable record of a single attempted transition.

use crate::model::state::{Trigger, WorkflowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalCategory {
    Workflow,
    Safety,
    Hardware,
    System,
}

/// Name and outcome of a single guard evaluated during a transition attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardOutcome {
    pub name: String,
    pub passed: bool,
    pub reason: Option<String>,
}

/// One append-only journal record. Created exclusively by the executor before a
/// state change becomes observable: the executor blocks until this is
/// durable and only then mutates `current_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJournalEntry {
    pub transition_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub trigger: Trigger,
    pub guard_results: Vec<GuardOutcome>,
    pub operator_id: Option<String>,
    pub study_instance_uid: Option<String>,
    pub category: JournalCategory,
    pub metadata: HashMap<String, String>,
}

impl WorkflowJournalEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        from_state: WorkflowState,
        to_state: WorkflowState,
        trigger: Trigger,
        guard_results: Vec<GuardOutcome>,
        operator_id: Option<String>,
        study_instance_uid: Option<String>,
        category: JournalCategory,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            transition_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            from_state,
            to_state,
            trigger,
            guard_results,
            operator_id,
            study_instance_uid,
            category,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip_preserves_entry() {
        let entry = WorkflowJournalEntry::new(
            WorkflowState::Idle,
            WorkflowState::WorklistSync,
            Trigger::WorklistSyncRequested,
            vec![GuardOutcome {
                name: "NetworkReachableOrSyncIntervalElapsed".into(),
                passed: true,
                reason: None,
            }],
            Some("op1".into()),
            None,
            JournalCategory::Workflow,
            HashMap::new(),
        );
        let json = serde_json::to_string(&entry).expect("serialize");
        let back: WorkflowJournalEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.transition_id, entry.transition_id);
        assert_eq!(back.from_state, entry.from_state);
        assert_eq!(back.to_state, entry.to_state);
        assert_eq!(back.guard_results.len(), 1);
    }
}
