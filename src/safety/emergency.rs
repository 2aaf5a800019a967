//! Emergency shutdown sequencer: the fixed abort-then-standby sequence run whenever
//! a critical hardware error fires or a crash is recovered from a non-idle state.

use crate::ports::hvg::HvgPort;
use crate::ports::safety_port::SafetyPort;
use std::sync::Arc;
use tracing::{error, warn};

/// Runs generator abort followed by emergency standby. Errors from either step are
/// logged, never propagated as a reason to skip the other — this sequence must run
/// to completion on every critical-hardware path.
pub struct EmergencySequencer {
    hvg: Arc<dyn HvgPort>,
    safety: Arc<dyn SafetyPort>,
}

impl EmergencySequencer {
    pub fn new(hvg: Arc<dyn HvgPort>, safety: Arc<dyn SafetyPort>) -> Self {
        Self { hvg, safety }
    }

    /// Aborts any in-progress exposure and commands the hardware to standby. Must
    /// complete before the caller reports the transition to `Idle`, or before crash
    /// recovery presents any option to the operator.
    pub async fn execute(&self) {
        if let Err(err) = self.hvg.abort_exposure().await {
            error!(error = %err, "emergency abort_exposure failed");
        }
        if let Err(err) = self.safety.emergency_standby().await {
            error!(error = %err, "emergency_standby failed");
        }
        warn!("emergency shutdown sequence complete: generator aborted, hardware in standby");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{MockHvg, MockSafety};

    #[tokio::test]
    async fn execute_aborts_and_commands_standby() {
        let hvg = Arc::new(MockHvg::default());
        let safety = Arc::new(MockSafety::default());
        let sequencer = EmergencySequencer::new(hvg.clone(), safety.clone());
        sequencer.execute().await;
        assert_eq!(hvg.aborted_count(), 1);
        assert_eq!(safety.standby_count(), 1);
        assert!(!hvg.is_armed());
    }
}
