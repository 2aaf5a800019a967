//! `RejectRetake` entry: tags the just-reviewed exposure with its reject reason and
//! confirms its dose is counted toward the study even though the image was
//! discarded.

use super::{HandlerContext, StateHandler};
use crate::error::{EngineError, EngineResult};
use crate::events::WorkflowEvent;
use crate::model::study::ExposureStatus;
use crate::model::transition::TransitionPayload;
use async_trait::async_trait;

pub struct RejectRetakeHandler;

#[async_trait]
impl StateHandler for RejectRetakeHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        let TransitionPayload::Reject { reason } = &ctx.payload else {
            return Err(EngineError::ParameterRejected(
                "ImageRejected without a reason".into(),
            ));
        };
        let reason = *reason;

        let study = ctx
            .study_context
            .as_mut()
            .ok_or_else(|| EngineError::ParameterRejected("no active study".into()))?;
        let study_instance_uid = study.study_instance_uid.clone();
        let record = study
            .exposure_series
            .last_mut()
            .ok_or_else(|| EngineError::ParameterRejected("no exposure record to reject".into()))?;
        record.status = ExposureStatus::Rejected;
        record.reject_reason = Some(reason);
        let dap = record.administered_dap.unwrap_or(0.0);

        ctx.collaborators
            .dose_tracker
            .record_rejected(&study_instance_uid, dap)
            .await?;

        ctx.events.publish(WorkflowEvent::ImageRejected {
            study_instance_uid,
            reason: format!("{reason:?}"),
        });
        Ok(())
    }
}
