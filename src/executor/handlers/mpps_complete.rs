//! `MppsComplete` entry: reports the study's modality performed procedure step
//! outcome, reached either from a completed study or a cancelled retake.

use super::{HandlerContext, StateHandler};
use crate::error::{EngineError, EngineResult};
use crate::model::state::Trigger;
use crate::model::study::ExposureStatus;
use async_trait::async_trait;

pub struct MppsCompleteHandler;

#[async_trait]
impl StateHandler for MppsCompleteHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        if ctx.study_context.is_none() {
            return Err(EngineError::ParameterRejected("no active study".into()));
        }

        if ctx.trigger == Trigger::RetakeCancelled {
            let study = ctx.study_context.as_ref().expect("checked above");
            ctx.collaborators
                .mpps
                .set_discontinued(study, "retake cancelled by operator")
                .await?;
            return Ok(());
        }

        if let Some(record) = ctx
            .study_context
            .as_mut()
            .and_then(|s| s.exposure_series.last_mut())
        {
            record.status = ExposureStatus::Accepted;
        }

        let study = ctx.study_context.as_ref().expect("checked above");
        ctx.collaborators.mpps.set_completed(study).await?;
        ctx.collaborators
            .dose_tracker
            .finalize_study(&study.study_instance_uid)
            .await?;
        Ok(())
    }
}
