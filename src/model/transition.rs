//! Transition requests and the outcomes the executor returns for them.

use crate::model::context::GuardEvaluationContext;
use crate::model::protocol::Protocol;
use crate::model::state::{Trigger, WorkflowState};
use crate::model::study::RejectReason;
use crate::ports::detector::AcquiredImage;
use crate::EngineError;

/// Typed payload carried alongside a trigger, for handlers that need more than the
/// guard-predicate booleans in [`GuardEvaluationContext`] — e.g. the actual
/// `Protocol` a `ProtocolConfirmed` trigger is confirming.
#[derive(Debug, Clone, Default)]
pub enum TransitionPayload {
    #[default]
    None,
    Patient {
        patient_id: String,
        patient_name: String,
        birth_date: Option<String>,
        sex: Option<String>,
        worklist_item_uid: Option<String>,
        is_emergency: bool,
    },
    Protocol(Protocol),
    AcquiredImage {
        image: AcquiredImage,
        administered_dap: f64,
    },
    Reject {
        reason: RejectReason,
    },
    HasMoreExposures(bool),
}

/// A request to move the workflow from its current state via `trigger`.
///
/// Hardware-originated events (e.g. `AcquisitionComplete`) are converted into one of
/// these by the adapter that received the callback and posted onto the executor's
/// single-consumer channel — never applied directly on the callback thread.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub target_state: Option<WorkflowState>,
    pub trigger: Trigger,
    pub operator_id: Option<String>,
    pub context: GuardEvaluationContext,
    pub payload: TransitionPayload,
}

impl TransitionRequest {
    pub fn new(trigger: Trigger, context: GuardEvaluationContext) -> Self {
        Self {
            target_state: None,
            trigger,
            operator_id: None,
            context,
            payload: TransitionPayload::None,
        }
    }

    pub fn with_operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    pub fn with_payload(mut self, payload: TransitionPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// The outcome of a single transition attempt.
///
/// This replaces exceptions-for-control-flow: every failure mode is an explicit arm.
/// The only path that force-promotes a failure into an applied state change is the
/// unconditional `CriticalHardwareError` transition, handled inside the executor
/// itself.
#[derive(Debug, Clone)]
pub enum TransitionResult {
    Success {
        old: WorkflowState,
        new: WorkflowState,
        trigger: Trigger,
    },
    GuardFailed {
        state: WorkflowState,
        failed_guards: Vec<String>,
    },
    InvalidTransition {
        state: WorkflowState,
        requested: Option<WorkflowState>,
        trigger: Trigger,
    },
    Errored {
        state: WorkflowState,
        error: EngineError,
    },
}

impl TransitionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionResult::Success { .. })
    }
}
