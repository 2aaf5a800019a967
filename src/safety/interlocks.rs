//! The interlock chain: a bounded-latency wrapper over [`SafetyPort`] that treats
//! any query exceeding the configured timeout as FAILED.

use crate::model::interlock::InterlockStatus;
use crate::ports::safety_port::SafetyPort;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Evaluates the nine-signal interlock snapshot with a hard timeout. Cached values
/// are never reused after a failure: callers must re-snapshot for the next attempt
///.
#[derive(Clone)]
pub struct InterlockChain {
    port: Arc<dyn SafetyPort>,
    timeout: Duration,
}

impl InterlockChain {
    pub fn new(port: Arc<dyn SafetyPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// One atomic snapshot. A timeout or port error is never surfaced as "unknown" —
    /// it is treated as every signal failed, fail-closed.
    pub async fn snapshot(&self) -> InterlockStatus {
        match tokio::time::timeout(self.timeout, self.port.check_all_interlocks()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                warn!(error = %err, "interlock query returned an error; treating as failed");
                InterlockStatus::all_failed()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "interlock query exceeded timeout; treating as failed"
                );
                InterlockStatus::all_failed()
            }
        }
    }

    /// Returns `Ok(())` only if all nine signals meet their required value;
    /// otherwise the offending IDs, for operator surfacing and journaling.
    pub async fn verify_before_exposure(&self) -> Result<(), Vec<&'static str>> {
        let status = self.snapshot().await;
        if status.all_ok() {
            Ok(())
        } else {
            Err(status.offending_ids())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::MockSafety;

    #[tokio::test]
    async fn nominal_snapshot_passes() {
        let port = Arc::new(MockSafety::default());
        let chain = InterlockChain::new(port, Duration::from_millis(10));
        assert!(chain.verify_before_exposure().await.is_ok());
    }

    #[tokio::test]
    async fn door_open_is_surfaced() {
        let port = Arc::new(MockSafety::default());
        let mut status = crate::model::interlock::InterlockStatus::all_clear();
        status.door_closed = false;
        port.set_status(status);
        let chain = InterlockChain::new(port, Duration::from_millis(10));
        let offending = chain.verify_before_exposure().await.unwrap_err();
        assert_eq!(offending, vec!["IL-01"]);
    }
}
