//! Mid-exposure interlock monitor.
//!
//! Spawned when the engine enters `ExposureTrigger` and stopped the moment it leaves.
//! Polls the interlock chain at `mid_exposure_poll_ms` cadence; the instant any signal
//! drops, it aborts the generator, captures whatever dose was administered, and posts
//! an `AcquisitionFailed` transition — never applying the transition itself, per the
//! same callback-to-channel rule hardware adapters follow.

use crate::events::{WorkflowEvent, WorkflowEventBus};
use crate::executor::engine::EngineHandle;
use crate::model::context::GuardEvaluationContext;
use crate::model::state::Trigger;
use crate::model::transition::TransitionRequest;
use crate::ports::dose_tracker::DoseTrackerPort;
use crate::ports::hvg::HvgPort;
use crate::safety::interlocks::InterlockChain;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, warn};

pub struct MidExposureMonitor {
    interlocks: InterlockChain,
    hvg: Arc<dyn HvgPort>,
    dose_tracker: Arc<dyn DoseTrackerPort>,
    events: WorkflowEventBus,
    handle: EngineHandle,
    study_instance_uid: String,
    poll_interval: Duration,
}

impl MidExposureMonitor {
    /// Spawns the polling task and returns a stop handle; sending on it (or simply
    /// dropping it) ends the monitor at the next poll boundary.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        interlocks: InterlockChain,
        hvg: Arc<dyn HvgPort>,
        dose_tracker: Arc<dyn DoseTrackerPort>,
        events: WorkflowEventBus,
        handle: EngineHandle,
        study_instance_uid: String,
        poll_interval: Duration,
    ) -> oneshot::Sender<()> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let monitor = MidExposureMonitor {
            interlocks,
            hvg,
            dose_tracker,
            events,
            handle,
            study_instance_uid,
            poll_interval,
        };
        tokio::spawn(monitor.run(stop_rx));
        stop_tx
    }

    async fn run(self, mut stop: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = &mut stop => return,
                _ = ticker.tick() => {
                    let status = self.interlocks.snapshot().await;
                    if status.all_ok() {
                        continue;
                    }
                    let offending = status.offending_ids();
                    warn!(?offending, "interlock lost mid-exposure; aborting");

                    if let Err(err) = self.hvg.abort_exposure().await {
                        error!(error = %err, "abort_exposure failed during mid-exposure interlock loss");
                    }

                    let dap = match self.dose_tracker.stop_exposure(&self.study_instance_uid).await {
                        Ok(dap) => dap,
                        Err(err) => {
                            error!(error = %err, "failed to read partial dose after abort");
                            0.0
                        }
                    };

                    self.events.publish(WorkflowEvent::OperatorNotification {
                        message: format!(
                            "exposure aborted: interlock(s) {offending:?} lost; partial dose {dap:.2} mGy·cm²"
                        ),
                        category: crate::journal::entry::JournalCategory::Safety,
                    });

                    let context = GuardEvaluationContext::new()
                        .with_metadata("offending_interlocks", format!("{offending:?}"))
                        .with_metadata("partial_dap", dap.to_string());
                    self.handle
                        .submit_detached(TransitionRequest::new(Trigger::AcquisitionFailed, context));
                    return;
                }
            }
        }
    }
}
