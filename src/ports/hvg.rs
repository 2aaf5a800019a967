//! High-voltage generator capability port. Out of scope: the concrete
//! driver. In scope: the interface the engine programs against.

use crate::error::EngineResult;
use crate::model::protocol::Protocol;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStatus {
    Ok,
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalStatus {
    Normal,
    Warning,
    Overheated,
}

#[async_trait]
pub trait HvgPort: Send + Sync {
    async fn set_exposure_parameters(&self, protocol: &Protocol) -> EngineResult<()>;
    async fn arm(&self) -> EngineResult<()>;
    async fn trigger_exposure(&self) -> EngineResult<()>;
    async fn abort_exposure(&self) -> EngineResult<()>;
    async fn get_fault_status(&self) -> EngineResult<FaultStatus>;
    async fn get_thermal_status(&self) -> EngineResult<ThermalStatus>;
}
