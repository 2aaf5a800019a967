//! `PatientSelect` entry: populates the active study from whatever patient identity
//! accompanied the transition — a matched worklist item, or an emergency
//! quick-entry. When no payload accompanies entry (no worklist match), the operator
//! supplies patient identity later via `confirm_patient`.

use super::{apply_patient_payload, HandlerContext, StateHandler};
use crate::error::EngineResult;
use async_trait::async_trait;

pub struct PatientSelectHandler;

#[async_trait]
impl StateHandler for PatientSelectHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        apply_patient_payload(ctx.study_context, &ctx.payload);
        Ok(())
    }
}
