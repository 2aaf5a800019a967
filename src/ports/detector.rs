//! Flat-panel detector capability port.

use crate::error::EngineResult;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorStatus {
    Idle,
    Ready,
    Acquiring,
    Fault,
}

/// Raw acquired image, handed to the `ExposureTrigger` handler for validation and
/// on into `QcReview`. Pixel data itself is outside this crate's concern — no image
/// rendering or processing here; only enough metadata to validate and route the
/// image is modeled.
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub image_instance_uid: String,
    pub is_valid: bool,
    pub byte_len: usize,
}

#[async_trait]
pub trait DetectorPort: Send + Sync {
    async fn start_acquisition(&self) -> EngineResult<()>;
    async fn get_status(&self) -> EngineResult<DetectorStatus>;
    async fn get_acquired_image(&self) -> EngineResult<AcquiredImage>;
}
