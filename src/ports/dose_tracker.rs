//! Dose tracker capability port. Persistence of dose history is external;
//! the engine only reads/writes the per-study accumulator through this interface.

use crate::error::EngineResult;
use async_trait::async_trait;

#[async_trait]
pub trait DoseTrackerPort: Send + Sync {
    async fn start_exposure(&self, study_instance_uid: &str) -> EngineResult<()>;
    /// Returns the dose administered by the exposure just ended (or aborted).
    async fn stop_exposure(&self, study_instance_uid: &str) -> EngineResult<f64>;
    /// Records dose from a rejected exposure, which still counts toward the
    /// cumulative study total.
    async fn record_rejected(&self, study_instance_uid: &str, dap: f64) -> EngineResult<()>;
    async fn finalize_study(&self, study_instance_uid: &str) -> EngineResult<()>;
    async fn get_cumulative(&self, study_instance_uid: &str) -> EngineResult<f64>;
    async fn check_within_limits(&self, study_instance_uid: &str) -> EngineResult<bool>;
}
