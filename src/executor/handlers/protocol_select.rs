//! `ProtocolSelect` entry: confirms the patient identity for a manually-entered
//! study, or simply returns here for the next exposure of an in-progress study.

use super::{apply_patient_payload, HandlerContext, StateHandler};
use crate::error::EngineResult;
use crate::model::state::Trigger;
use async_trait::async_trait;

pub struct ProtocolSelectHandler;

#[async_trait]
impl StateHandler for ProtocolSelectHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        if ctx.trigger == Trigger::PatientConfirmed {
            apply_patient_payload(ctx.study_context, &ctx.payload);
        }
        Ok(())
    }
}
