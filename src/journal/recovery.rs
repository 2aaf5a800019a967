//! Crash recovery.
//!
//! Reads the coherent tail of the journal, reconstructs the last known state and
//! study identity, and runs the emergency shutdown sequence before anything is
//! presented to the operator — hardware is never auto-resumed, regardless of which
//! state the journal says the engine was in when it stopped.

use crate::error::{EngineError, EngineResult};
use crate::journal::entry::WorkflowJournalEntry;
use crate::journal::writer::Journal;
use crate::model::state::WorkflowState;
use crate::safety::emergency::EmergencySequencer;
use std::time::Duration;
use tracing::{info, warn};

/// What recovery was able to determine from the journal alone. The journal records
/// state transitions and a study's identifier, not its full clinical detail — the
/// operator reconciles the rest before resuming.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    pub last_state: WorkflowState,
    pub recovered_study_instance_uid: Option<String>,
    pub entries_read: usize,
    pub emergency_sequence_ran: bool,
}

pub struct RecoveryService<'a> {
    journal: &'a dyn Journal,
    emergency: EmergencySequencer,
}

impl<'a> RecoveryService<'a> {
    pub fn new(journal: &'a dyn Journal, emergency: EmergencySequencer) -> Self {
        Self { journal, emergency }
    }

    /// Runs recovery, bounded by `deadline` (`EngineConfig::crash_recovery_deadline_ms`).
    pub async fn recover(&self, deadline: Duration) -> EngineResult<RecoveryReport> {
        match tokio::time::timeout(deadline, self.recover_inner()).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::HardwareTimeout(deadline.as_millis() as u64)),
        }
    }

    async fn recover_inner(&self) -> EngineResult<RecoveryReport> {
        let entries = self.journal.read_all().await?;
        info!(entries_read = entries.len(), "journal read for crash recovery");

        let last_state = entries
            .last()
            .map(|e: &WorkflowJournalEntry| e.to_state)
            .unwrap_or(WorkflowState::Idle);
        let recovered_study_instance_uid = entries
            .iter()
            .rev()
            .find_map(|e| e.study_instance_uid.clone());

        let emergency_sequence_ran = !last_state.is_idle();
        if emergency_sequence_ran {
            warn!(
                last_state = %last_state,
                "recovering from a non-idle state; running emergency shutdown before presenting options"
            );
            self.emergency.execute().await;
        }

        Ok(RecoveryReport {
            last_state,
            recovered_study_instance_uid,
            entries_read: entries.len(),
            emergency_sequence_ran,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::entry::JournalCategory;
    use crate::journal::writer::InMemoryJournal;
    use crate::model::state::Trigger;
    use crate::ports::mock::{MockHvg, MockSafety};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn journal_with_tail(to_state: WorkflowState, study_instance_uid: Option<String>) -> InMemoryJournal {
        let mut journal = InMemoryJournal::default();
        journal
            .append(&WorkflowJournalEntry::new(
                WorkflowState::Idle,
                WorkflowState::PatientSelect,
                Trigger::WorklistSyncRequested,
                vec![],
                None,
                study_instance_uid.clone(),
                JournalCategory::Workflow,
                HashMap::new(),
            ))
            .await
            .unwrap();
        journal
            .append(&WorkflowJournalEntry::new(
                WorkflowState::PatientSelect,
                to_state,
                Trigger::PatientConfirmed,
                vec![],
                None,
                study_instance_uid,
                JournalCategory::Workflow,
                HashMap::new(),
            ))
            .await
            .unwrap();
        journal
    }

    #[tokio::test]
    async fn non_idle_tail_runs_emergency_sequence() {
        let journal = journal_with_tail(WorkflowState::ExposureTrigger, Some("uid-1".into())).await;
        let hvg = Arc::new(MockHvg::default());
        let safety = Arc::new(MockSafety::default());
        let emergency = EmergencySequencer::new(hvg.clone(), safety.clone());
        let service = RecoveryService::new(&journal, emergency);

        let report = service.recover(Duration::from_millis(5000)).await.unwrap();
        assert_eq!(report.last_state, WorkflowState::ExposureTrigger);
        assert_eq!(report.recovered_study_instance_uid.as_deref(), Some("uid-1"));
        assert!(report.emergency_sequence_ran);
        assert_eq!(hvg.aborted_count(), 1);
        assert_eq!(safety.standby_count(), 1);
    }

    #[tokio::test]
    async fn idle_tail_skips_emergency_sequence() {
        let journal = journal_with_tail(WorkflowState::Idle, None).await;
        let hvg = Arc::new(MockHvg::default());
        let safety = Arc::new(MockSafety::default());
        let emergency = EmergencySequencer::new(hvg.clone(), safety.clone());
        let service = RecoveryService::new(&journal, emergency);

        let report = service.recover(Duration::from_millis(5000)).await.unwrap();
        assert!(!report.emergency_sequence_ran);
        assert_eq!(hvg.aborted_count(), 0);
    }
}
