//! DICOM collaborator ports: worklist query, MPPS, and store. Wire framing,
//! transport retries, and association management live in the concrete adapter;
//! these traits model only the operations the workflow needs.

use crate::error::EngineResult;
use crate::model::study::StudyContext;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct WorklistItem {
    pub worklist_item_uid: String,
    pub accession_number: String,
    pub patient_id: String,
    pub patient_name: String,
    pub scheduled_procedure_codes: Vec<String>,
}

#[async_trait]
pub trait WorklistPort: Send + Sync {
    async fn query(&self) -> EngineResult<Vec<WorklistItem>>;
}

#[async_trait]
pub trait MppsPort: Send + Sync {
    async fn create(&self, study: &StudyContext) -> EngineResult<()>;
    async fn set_completed(&self, study: &StudyContext) -> EngineResult<()>;
    async fn set_discontinued(&self, study: &StudyContext, reason: &str) -> EngineResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    Queued,
}

#[async_trait]
pub trait StorePort: Send + Sync {
    /// Submits one image; a failure here is never workflow-blocking:
    /// callers degrade to `StoreOutcome::Queued` and retry out of band.
    async fn store_image(&self, image_instance_uid: &str) -> EngineResult<StoreOutcome>;
}
