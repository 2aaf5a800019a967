//! The static `(from_state, trigger) -> to_state × guard_list` table.
//!
//! Building this as data rather than a hand-written match-per-trigger keeps the
//! transition table auditable as a single list instead of a sprawling match.

use crate::guard::predicates::*;
use crate::model::state::{Trigger, WorkflowState};
use once_cell::sync::Lazy;

/// One row of the transition table: a trigger applicable `from` a state, producing
/// `to` if every guard in `guards` passes.
pub struct TransitionRule {
    pub id: &'static str,
    pub from: WorkflowState,
    pub trigger: Trigger,
    pub to: WorkflowState,
    pub guards: &'static [Guard],
}

/// The rule id used for the unconditional critical-hardware-error transition,
/// checked explicitly by the executor to force-promote a failed safety-critical
/// operation into an applied state change rather than leaving it as a guard failure.
pub const CRITICAL_HARDWARE_ERROR_RULE_ID: &str = "critical_hardware_error";

static EMPTY_GUARDS: &[Guard] = &[];

fn non_idle_states() -> Vec<WorkflowState> {
    WorkflowState::ALL
        .into_iter()
        .filter(|s| !s.is_idle())
        .collect()
}

/// The full transition table. Built once and reused for the lifetime of the
/// process; rules are evaluated in declaration order, and for a `(from, trigger)`
/// pair with more than one candidate row (`accept_image_study_complete` and
/// `accept_image_more_exposures` both key on `(QcReview, ImageAccepted)`), the
/// first row whose guards all pass wins.
pub static TRANSITION_MATRIX: Lazy<Vec<TransitionRule>> = Lazy::new(|| {
    use Trigger::*;
    use WorkflowState::*;

    let mut rules = vec![
        TransitionRule {
            id: "start_worklist_sync",
            from: Idle,
            trigger: WorklistSyncRequested,
            to: WorklistSync,
            guards: &[NETWORK_REACHABLE_OR_SYNC_DUE],
        },
        TransitionRule {
            id: "start_emergency_workflow",
            from: Idle,
            trigger: EmergencyWorkflowRequested,
            to: PatientSelect,
            guards: &[HARDWARE_INTERLOCK_OK],
        },
        TransitionRule {
            id: "worklist_response_received",
            from: WorklistSync,
            trigger: WorklistResponseReceived,
            to: PatientSelect,
            guards: EMPTY_GUARDS,
        },
        TransitionRule {
            id: "worklist_timeout",
            from: WorklistSync,
            trigger: WorklistTimeout,
            to: PatientSelect,
            guards: &[WORKLIST_RETRY_EXHAUSTED],
        },
        TransitionRule {
            id: "worklist_error",
            from: WorklistSync,
            trigger: WorklistError,
            to: PatientSelect,
            guards: &[WORKLIST_RETRY_EXHAUSTED],
        },
        TransitionRule {
            id: "confirm_patient",
            from: PatientSelect,
            trigger: PatientConfirmed,
            to: ProtocolSelect,
            guards: &[PATIENT_ID_NOT_EMPTY],
        },
        TransitionRule {
            id: "confirm_protocol",
            from: ProtocolSelect,
            trigger: ProtocolConfirmed,
            to: PositionAndPreview,
            guards: &[PROTOCOL_VALID, EXPOSURE_PARAMS_IN_SAFE_RANGE],
        },
        TransitionRule {
            id: "operator_ready",
            from: PositionAndPreview,
            trigger: OperatorReady,
            to: ExposureTrigger,
            guards: &[HARDWARE_INTERLOCK_OK, DETECTOR_READY],
        },
        TransitionRule {
            id: "acquisition_complete",
            from: ExposureTrigger,
            trigger: AcquisitionComplete,
            to: QcReview,
            guards: &[IMAGE_DATA_VALID],
        },
        TransitionRule {
            id: "acquisition_failed",
            from: ExposureTrigger,
            trigger: AcquisitionFailed,
            to: QcReview,
            guards: EMPTY_GUARDS,
        },
        TransitionRule {
            id: "accept_image_study_complete",
            from: QcReview,
            trigger: ImageAccepted,
            to: MppsComplete,
            guards: &[STUDY_HAS_NO_MORE_EXPOSURES],
        },
        TransitionRule {
            id: "accept_image_more_exposures",
            from: QcReview,
            trigger: ImageAccepted,
            to: ProtocolSelect,
            guards: &[STUDY_HAS_MORE_EXPOSURES],
        },
        TransitionRule {
            id: "reject_image",
            from: QcReview,
            trigger: ImageRejected,
            to: RejectRetake,
            guards: &[REJECT_REASON_PROVIDED],
        },
        TransitionRule {
            id: "approve_retake",
            from: RejectRetake,
            trigger: RetakeApproved,
            to: PositionAndPreview,
            guards: &[HARDWARE_INTERLOCK_OK],
        },
        TransitionRule {
            id: "cancel_retake",
            from: RejectRetake,
            trigger: RetakeCancelled,
            to: MppsComplete,
            guards: EMPTY_GUARDS,
        },
        TransitionRule {
            id: "initiate_export",
            from: MppsComplete,
            trigger: ExportInitiated,
            to: PacsExport,
            guards: &[STUDY_HAS_IMAGES],
        },
        TransitionRule {
            id: "export_complete",
            from: PacsExport,
            trigger: ExportComplete,
            to: Idle,
            guards: &[ALL_IMAGES_TRANSFERRED],
        },
        TransitionRule {
            id: "export_failed",
            from: PacsExport,
            trigger: ExportFailed,
            to: Idle,
            guards: &[EXPORT_RETRY_EXHAUSTED],
        },
    ];

    // Unconditional, from every state including Idle.
    for state in WorkflowState::ALL {
        rules.push(TransitionRule {
            id: CRITICAL_HARDWARE_ERROR_RULE_ID,
            from: state,
            trigger: CriticalHardwareError,
            to: Idle,
            guards: EMPTY_GUARDS,
        });
    }

    // Every state except Idle, gated on operator authorization.
    for state in non_idle_states() {
        rules.push(TransitionRule {
            id: "abort_study",
            from: state,
            trigger: StudyAbortRequested,
            to: Idle,
            guards: &[OPERATOR_AUTHORIZED],
        });
    }

    rules
});

/// All rows matching `(from, trigger)`, in declaration order.
pub fn candidates(from: WorkflowState, trigger: Trigger) -> Vec<&'static TransitionRule> {
    TRANSITION_MATRIX
        .iter()
        .filter(|r| r.from == from && r.trigger == trigger)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::context::GuardEvaluationContext;

    #[test]
    fn unknown_pair_has_no_candidates() {
        assert!(candidates(WorkflowState::Idle, Trigger::ImageAccepted).is_empty());
    }

    #[test]
    fn qc_review_image_accepted_has_two_candidates() {
        let rows = candidates(WorkflowState::QcReview, Trigger::ImageAccepted);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn critical_hardware_error_defined_from_every_state() {
        for state in WorkflowState::ALL {
            let rows = candidates(state, Trigger::CriticalHardwareError);
            assert_eq!(rows.len(), 1, "missing critical-hardware-error row for {state}");
            assert_eq!(rows[0].to, WorkflowState::Idle);
        }
    }

    #[test]
    fn study_abort_not_defined_from_idle() {
        assert!(candidates(WorkflowState::Idle, Trigger::StudyAbortRequested).is_empty());
        assert_eq!(
            candidates(WorkflowState::QcReview, Trigger::StudyAbortRequested).len(),
            1
        );
    }

    #[test]
    fn protocol_confirmed_guard_rejects_out_of_range_params() {
        let rows = candidates(WorkflowState::ProtocolSelect, Trigger::ProtocolConfirmed);
        assert_eq!(rows.len(), 1);
        let mut ctx = GuardEvaluationContext::new();
        ctx.protocol_valid = true;
        ctx.exposure_params_in_safe_range = false;
        let failed: Vec<&str> = rows[0]
            .guards
            .iter()
            .filter(|g| !(g.check)(&ctx))
            .map(|g| g.name)
            .collect();
        assert_eq!(failed, vec!["ExposureParamsOutOfRange"]);
    }
}
