//! `ExposureTrigger` entry: arms the generator, starts dose accounting, and spawns
//! the mid-exposure interlock monitor. Actual beam-on is a separate operator command
//! (`trigger_exposure` on the public API) — entering this state means "armed and
//! ready," not "firing".

use super::{HandlerContext, StateHandler};
use crate::error::{EngineError, EngineResult};
use crate::events::WorkflowEvent;
use crate::safety::monitor::MidExposureMonitor;
use async_trait::async_trait;

pub struct ExposureTriggerHandler;

#[async_trait]
impl StateHandler for ExposureTriggerHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        let study_instance_uid = ctx
            .study_context
            .as_ref()
            .ok_or_else(|| EngineError::ParameterRejected("no active study".into()))?
            .study_instance_uid
            .clone();

        ctx.collaborators.hvg.arm().await?;
        ctx.collaborators
            .dose_tracker
            .start_exposure(&study_instance_uid)
            .await?;

        let stop = MidExposureMonitor::spawn(
            ctx.interlocks.clone(),
            ctx.collaborators.hvg.clone(),
            ctx.collaborators.dose_tracker.clone(),
            ctx.events.clone(),
            ctx.handle.clone(),
            study_instance_uid.clone(),
            ctx.config.mid_exposure_poll_duration(),
        );
        *ctx.monitor_stop = Some(stop);

        ctx.events.publish(WorkflowEvent::ExposureTriggered {
            study_instance_uid,
        });
        Ok(())
    }
}
