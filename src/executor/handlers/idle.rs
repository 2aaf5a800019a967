//! `Idle` entry: the patient record is dropped and only a non-identifying summary is
//! logged. This runs whether `Idle` was reached by a normal export completion, a
//! critical hardware error, or an operator-initiated abort. An operator abort with
//! an active study also reports MPPS-discontinued before the study is dropped;
//! the hardware abort itself already ran ahead of this handler, in the executor's
//! pre-transition special-case for `StudyAbortRequested`.

use super::{HandlerContext, StateHandler};
use crate::error::EngineResult;
use crate::model::state::Trigger;
use async_trait::async_trait;
use tracing::{info, warn};

pub struct IdleHandler;

#[async_trait]
impl StateHandler for IdleHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        if let Some(study) = ctx.study_context.take() {
            if ctx.trigger == Trigger::StudyAbortRequested {
                if let Err(err) = ctx
                    .collaborators
                    .mpps
                    .set_discontinued(&study, "study aborted by operator")
                    .await
                {
                    warn!(error = %err, "failed to report MPPS discontinued for aborted study");
                }
            }
            let summary = study.anonymized_summary();
            info!(
                study_instance_uid = %summary.study_instance_uid,
                exposure_count = summary.exposure_count,
                was_emergency = summary.was_emergency,
                "study closed, patient context dropped"
            );
        }
        Ok(())
    }
}
