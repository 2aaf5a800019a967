//! `WorklistSync` entry: queries the DICOM modality worklist and posts the follow-up
//! trigger. Runs inline on the executor task — bounded by the worklist port's own
//! timeout behavior, not by the engine.
//!
//! The follow-up transition is submitted detached rather than awaited: the executor
//! task that is running this handler is the same task that would have to process
//! that follow-up message, so awaiting it here would deadlock.

use super::{HandlerContext, StateHandler};
use crate::error::EngineResult;
use crate::model::context::GuardEvaluationContext;
use crate::model::state::Trigger;
use crate::model::transition::{TransitionPayload, TransitionRequest};
use async_trait::async_trait;
use tracing::{info, warn};

pub struct WorklistSyncHandler;

#[async_trait]
impl StateHandler for WorklistSyncHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        match ctx.collaborators.worklist.query().await {
            Ok(items) if !items.is_empty() => {
                let item = items[0].clone();
                info!(worklist_item_uid = %item.worklist_item_uid, "worklist item matched");
                let payload = TransitionPayload::Patient {
                    patient_id: item.patient_id,
                    patient_name: item.patient_name,
                    birth_date: None,
                    sex: None,
                    worklist_item_uid: Some(item.worklist_item_uid),
                    is_emergency: false,
                };
                ctx.handle.submit_detached(
                    TransitionRequest::new(Trigger::WorklistResponseReceived, GuardEvaluationContext::new())
                        .with_payload(payload),
                );
            }
            Ok(_) => {
                info!("worklist query returned no items; operator proceeds to manual entry");
                ctx.handle.submit_detached(TransitionRequest::new(
                    Trigger::WorklistResponseReceived,
                    GuardEvaluationContext::new(),
                ));
            }
            Err(err) => {
                warn!(error = %err, "worklist query failed");
                let mut guard_ctx = GuardEvaluationContext::new();
                guard_ctx.worklist_retry_exhausted = true;
                ctx.handle
                    .submit_detached(TransitionRequest::new(Trigger::WorklistError, guard_ctx));
            }
        }
        Ok(())
    }
}
