//! `QcReview` entry: records the outcome of the just-completed or just-aborted
//! exposure onto its record before the operator reviews it.

use super::{HandlerContext, StateHandler};
use crate::error::{EngineError, EngineResult};
use crate::events::WorkflowEvent;
use crate::model::state::Trigger;
use crate::model::study::ExposureStatus;
use crate::model::transition::TransitionPayload;
use async_trait::async_trait;

pub struct QcReviewHandler;

#[async_trait]
impl StateHandler for QcReviewHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        let study = ctx
            .study_context
            .as_mut()
            .ok_or_else(|| EngineError::ParameterRejected("no active study".into()))?;
        let study_instance_uid = study.study_instance_uid.clone();
        let record = study
            .exposure_series
            .last_mut()
            .ok_or_else(|| EngineError::ParameterRejected("no pending exposure record".into()))?;

        match (ctx.trigger, &ctx.payload) {
            (Trigger::AcquisitionComplete, TransitionPayload::AcquiredImage { image, administered_dap }) => {
                record.status = if image.is_valid {
                    ExposureStatus::Acquired
                } else {
                    ExposureStatus::Incomplete
                };
                record.image_instance_uid = Some(image.image_instance_uid.clone());
                record.administered_dap = Some(*administered_dap);
                record.acquired_at = Some(chrono::Utc::now());
                ctx.events.publish(WorkflowEvent::ExposureCompleted { study_instance_uid });
            }
            (Trigger::AcquisitionFailed, _) => {
                record.status = ExposureStatus::Incomplete;
                record.acquired_at = Some(chrono::Utc::now());
                let dap = ctx
                    .collaborators
                    .dose_tracker
                    .get_cumulative(&study_instance_uid)
                    .await
                    .unwrap_or(0.0);
                record.administered_dap = Some(dap);
            }
            _ => {}
        }
        Ok(())
    }
}
