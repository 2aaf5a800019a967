//! `PacsExport` entry: submits every accepted image to PACS, retrying a bounded
//! number of times per image before declaring the export complete or failed. A PACS
//! failure never blocks the workflow — it only determines whether the study ends at
//! `Idle` via `ExportComplete` or `ExportFailed`; both routes end there.

use super::{HandlerContext, StateHandler};
use crate::error::EngineResult;
use crate::model::context::GuardEvaluationContext;
use crate::model::state::Trigger;
use crate::model::study::ExposureStatus;
use crate::model::transition::TransitionRequest;
use crate::ports::dicom::StoreOutcome;
use async_trait::async_trait;
use tracing::{info, warn};

pub struct PacsExportHandler;

#[async_trait]
impl StateHandler for PacsExportHandler {
    async fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> EngineResult<()> {
        let Some(study) = ctx.study_context.as_ref() else {
            ctx.handle.submit_detached(TransitionRequest::new(
                Trigger::ExportFailed,
                GuardEvaluationContext::new(),
            ));
            return Ok(());
        };

        let image_uids: Vec<String> = study
            .exposure_series
            .iter()
            .filter(|e| e.status == ExposureStatus::Accepted)
            .filter_map(|e| e.image_instance_uid.clone())
            .collect();

        let max_retries = ctx.config.export.max_retries;
        let mut all_stored = true;
        for uid in &image_uids {
            let mut stored = false;
            for attempt in 0..=max_retries {
                match ctx.collaborators.store.store_image(uid).await {
                    Ok(StoreOutcome::Stored) => {
                        stored = true;
                        break;
                    }
                    Ok(StoreOutcome::Queued) => {
                        warn!(image_instance_uid = %uid, attempt, "PACS store queued, retrying");
                    }
                    Err(err) => {
                        warn!(image_instance_uid = %uid, attempt, error = %err, "PACS store failed, retrying");
                    }
                }
            }
            if !stored {
                all_stored = false;
            }
        }

        let mut guard_ctx = GuardEvaluationContext::new();
        if all_stored {
            guard_ctx.all_images_transferred = true;
            info!(count = image_uids.len(), "all images transferred to PACS");
            ctx.handle
                .submit_detached(TransitionRequest::new(Trigger::ExportComplete, guard_ctx));
        } else {
            guard_ctx.export_retry_exhausted = true;
            warn!("PACS export retries exhausted for one or more images; study still closes");
            ctx.handle
                .submit_detached(TransitionRequest::new(Trigger::ExportFailed, guard_ctx));
        }
        Ok(())
    }
}
