//! Per-state entry handlers: the side effects a state performs on entry,
//! dispatched by [`crate::executor::engine::WorkflowExecutor`] after a transition's
//! journal entry is durable and `current_state` has moved.
//!
//! Each handler is a zero-sized type reached through `handler_for`, a dispatch
//! registry rather than one large match embedded in the executor itself.

mod exposure_trigger;
mod idle;
mod mpps_complete;
mod pacs_export;
mod patient_select;
mod position_and_preview;
mod protocol_select;
mod qc_review;
mod reject_retake;
mod worklist_sync;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::events::WorkflowEventBus;
use crate::executor::engine::{Collaborators, EngineHandle};
use crate::model::state::{Trigger, WorkflowState};
use crate::model::study::StudyContext;
use crate::model::transition::TransitionPayload;
use crate::protocol_repo::ProtocolRepository;
use crate::safety::interlocks::InterlockChain;
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Everything a handler needs to perform its entry side effects. Borrowed from the
/// executor for the duration of one `on_enter` call; never stored.
pub struct HandlerContext<'a> {
    pub study_context: &'a mut Option<StudyContext>,
    pub collaborators: &'a Collaborators,
    pub config: &'a EngineConfig,
    pub handle: EngineHandle,
    pub events: &'a WorkflowEventBus,
    pub protocol_repo: &'a ProtocolRepository,
    pub interlocks: &'a InterlockChain,
    pub monitor_stop: &'a mut Option<oneshot::Sender<()>>,
    pub trigger: Trigger,
    pub operator_id: Option<String>,
    pub payload: TransitionPayload,
    pub old_state: WorkflowState,
}

#[async_trait]
pub trait StateHandler: Send + Sync {
    /// Runs whatever side effects this state requires on entry. An `Err` here is
    /// surfaced to the original caller as `TransitionResult::Errored`; if it is a
    /// critical-hardware error on a safety-critical edge, the executor force-promotes
    /// it into the unconditional critical-hardware-error transition to `Idle`.
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()>;
}

/// Populates (or creates) the active study from a `Patient` payload, used by both
/// the worklist/emergency entry path (`PatientSelect`) and the manual-confirmation
/// path (`ProtocolSelect` via `PatientConfirmed`): the study is created at
/// `PatientSelect` entry, not later.
pub(super) fn apply_patient_payload(study_context: &mut Option<StudyContext>, payload: &TransitionPayload) {
    let TransitionPayload::Patient {
        patient_id,
        patient_name,
        birth_date,
        sex,
        worklist_item_uid,
        is_emergency,
    } = payload
    else {
        return;
    };

    let mut study = if *is_emergency {
        StudyContext::new_emergency(
            uuid::Uuid::new_v4().to_string(),
            patient_id.clone(),
            patient_name.clone(),
        )
    } else {
        StudyContext::new(
            uuid::Uuid::new_v4().to_string(),
            worklist_item_uid.clone().unwrap_or_default(),
            patient_id.clone(),
        )
    };
    study.patient_name = patient_name.clone();
    study.birth_date = birth_date.clone();
    study.sex = sex.clone();
    study.worklist_item_uid = worklist_item_uid.clone();
    *study_context = Some(study);
}

pub fn handler_for(state: WorkflowState) -> &'static dyn StateHandler {
    match state {
        WorkflowState::Idle => &idle::IdleHandler,
        WorkflowState::WorklistSync => &worklist_sync::WorklistSyncHandler,
        WorkflowState::PatientSelect => &patient_select::PatientSelectHandler,
        WorkflowState::ProtocolSelect => &protocol_select::ProtocolSelectHandler,
        WorkflowState::PositionAndPreview => &position_and_preview::PositionAndPreviewHandler,
        WorkflowState::ExposureTrigger => &exposure_trigger::ExposureTriggerHandler,
        WorkflowState::QcReview => &qc_review::QcReviewHandler,
        WorkflowState::RejectRetake => &reject_retake::RejectRetakeHandler,
        WorkflowState::MppsComplete => &mpps_complete::MppsCompleteHandler,
        WorkflowState::PacsExport => &pacs_export::PacsExportHandler,
    }
}
