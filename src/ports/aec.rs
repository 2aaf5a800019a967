//! Automatic exposure control capability port.

use crate::error::EngineResult;
use crate::model::protocol::Protocol;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AecReadiness {
    NotConfigured,
    Ready,
}

#[derive(Debug, Clone, Copy)]
pub struct RecommendedParams {
    pub kvp: f64,
    pub ma: f64,
}

#[async_trait]
pub trait AecPort: Send + Sync {
    async fn set_parameters(&self, protocol: &Protocol) -> EngineResult<()>;
    async fn get_readiness(&self) -> EngineResult<AecReadiness>;
    async fn get_recommended_params(&self) -> EngineResult<RecommendedParams>;
}
