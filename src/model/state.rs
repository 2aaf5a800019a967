//! The ten clinical states the engine can occupy.
//!
//! Exactly one [`WorkflowState`] is current per engine instance. `Idle` is both the
//! initial state and the state every completed or aborted study returns to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A clinical workflow state.
///
/// # State Machine
///
/// ```text
/// Idle ──WorklistSyncRequested──> WorklistSync ──(response/timeout)──> PatientSelect
/// Idle ──EmergencyWorkflowRequested───────────────────────────────────> PatientSelect
/// PatientSelect ──PatientConfirmed──> ProtocolSelect ──ProtocolConfirmed──> PositionAndPreview
/// PositionAndPreview ──OperatorReady──> ExposureTrigger ──(complete/failed)──> QcReview
/// QcReview ──ImageAccepted(more)──> ProtocolSelect
/// QcReview ──ImageAccepted(last)──> MppsComplete
/// QcReview ──ImageRejected──> RejectRetake ──RetakeApproved──> PositionAndPreview
/// RejectRetake ──RetakeCancelled──> MppsComplete
/// MppsComplete ──ExportInitiated──> PacsExport ──(complete/failed)──> Idle
/// * ──CriticalHardwareError──> Idle
/// (* except Idle) ──StudyAbortRequested──> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    Idle,
    WorklistSync,
    PatientSelect,
    ProtocolSelect,
    PositionAndPreview,
    ExposureTrigger,
    QcReview,
    RejectRetake,
    MppsComplete,
    PacsExport,
}

impl WorkflowState {
    /// All ten states, in workflow order.
    pub const ALL: [WorkflowState; 10] = [
        WorkflowState::Idle,
        WorkflowState::WorklistSync,
        WorkflowState::PatientSelect,
        WorkflowState::ProtocolSelect,
        WorkflowState::PositionAndPreview,
        WorkflowState::ExposureTrigger,
        WorkflowState::QcReview,
        WorkflowState::RejectRetake,
        WorkflowState::MppsComplete,
        WorkflowState::PacsExport,
    ];

    /// Whether this is the idle/terminal state.
    pub fn is_idle(&self) -> bool {
        matches!(self, WorkflowState::Idle)
    }

    /// Whether a transition from this state touches the safety-critical path and
    /// must be journaled with [`crate::journal::entry::JournalCategory::Safety`].
    pub fn is_safety_critical(&self) -> bool {
        matches!(
            self,
            WorkflowState::ExposureTrigger | WorkflowState::PositionAndPreview
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::WorklistSync => "WorklistSync",
            WorkflowState::PatientSelect => "PatientSelect",
            WorkflowState::ProtocolSelect => "ProtocolSelect",
            WorkflowState::PositionAndPreview => "PositionAndPreview",
            WorkflowState::ExposureTrigger => "ExposureTrigger",
            WorkflowState::QcReview => "QcReview",
            WorkflowState::RejectRetake => "RejectRetake",
            WorkflowState::MppsComplete => "MppsComplete",
            WorkflowState::PacsExport => "PacsExport",
        };
        write!(f, "{name}")
    }
}

/// The fixed set of triggers recognized by the guard matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    WorklistSyncRequested,
    EmergencyWorkflowRequested,
    WorklistResponseReceived,
    WorklistTimeout,
    WorklistError,
    PatientConfirmed,
    ProtocolConfirmed,
    OperatorReady,
    AcquisitionComplete,
    AcquisitionFailed,
    ImageAccepted,
    ImageRejected,
    RetakeApproved,
    RetakeCancelled,
    ExportInitiated,
    ExportComplete,
    ExportFailed,
    CriticalHardwareError,
    StudyAbortRequested,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_the_only_idle_state() {
        assert!(WorkflowState::Idle.is_idle());
        for state in WorkflowState::ALL.iter().filter(|s| !s.is_idle()) {
            assert!(!state.is_idle(), "{state} incorrectly reports is_idle");
        }
    }

    #[test]
    fn safety_critical_states_match_spec() {
        assert!(WorkflowState::ExposureTrigger.is_safety_critical());
        assert!(WorkflowState::PositionAndPreview.is_safety_critical());
        assert!(!WorkflowState::QcReview.is_safety_critical());
        assert!(!WorkflowState::Idle.is_safety_critical());
    }
}
