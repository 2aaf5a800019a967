//! `PositionAndPreview` entry: captures the confirmed protocol as an immutable
//! snapshot on a new exposure record, and pushes the parameters down to the
//! generator and AEC ahead of operator positioning. A hardware failure here is
//! returned to the executor, which force-promotes it to the critical-hardware-error
//! transition whenever the edge touches the safety-critical path — both states on
//! this edge do.

use super::{HandlerContext, StateHandler};
use crate::error::{EngineError, EngineResult};
use crate::model::state::Trigger;
use crate::model::study::{ExposureRecord, ExposureStatus};
use crate::model::transition::TransitionPayload;
use async_trait::async_trait;
use tracing::info;

pub struct PositionAndPreviewHandler;

#[async_trait]
impl StateHandler for PositionAndPreviewHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        let protocol = match ctx.trigger {
            Trigger::ProtocolConfirmed => match &ctx.payload {
                TransitionPayload::Protocol(protocol) => protocol.clone(),
                _ => {
                    return Err(EngineError::ParameterRejected(
                        "ProtocolConfirmed without a Protocol payload".into(),
                    ))
                }
            },
            Trigger::RetakeApproved => {
                let study = ctx
                    .study_context
                    .as_ref()
                    .ok_or_else(|| EngineError::ParameterRejected("no active study to retake".into()))?;
                study
                    .exposure_series
                    .iter()
                    .rev()
                    .find(|e| e.status == ExposureStatus::Rejected)
                    .map(|e| e.protocol_snapshot.clone())
                    .ok_or_else(|| EngineError::ParameterRejected("no rejected exposure to retake".into()))?
            }
            _ => return Ok(()),
        };

        ctx.collaborators.aec.set_parameters(&protocol).await?;
        ctx.collaborators.hvg.set_exposure_parameters(&protocol).await?;

        let study = ctx
            .study_context
            .as_mut()
            .ok_or_else(|| EngineError::ParameterRejected("no active study".into()))?;
        let index = study.next_index();
        let operator_id = ctx.operator_id.clone().unwrap_or_default();
        info!(index, protocol_id = %protocol.protocol_id, "exposure record opened");
        study
            .exposure_series
            .push(ExposureRecord::new(index, protocol, operator_id));
        Ok(())
    }
}
