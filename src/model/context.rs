//! Inputs the guard matrix may read when evaluating a transition.

use std::collections::HashMap;

/// Snapshot of every predicate input the guard matrix can reference.
///
/// The executor builds one of these per [`crate::model::transition::TransitionRequest`]
/// from the current interlock snapshot, study context, and caller-supplied data. Guards
/// are pure functions over this struct; they never reach back into the executor's state.
#[derive(Debug, Clone, Default)]
pub struct GuardEvaluationContext {
    pub network_reachable: bool,
    pub auto_sync_interval_elapsed: bool,
    pub worklist_retry_exhausted: bool,
    pub patient_id_non_empty: bool,
    pub protocol_valid: bool,
    pub exposure_params_in_safe_range: bool,
    pub hardware_interlock_ok: bool,
    pub detector_ready: bool,
    pub image_data_valid: bool,
    pub study_has_images: bool,
    pub study_has_more_exposures: bool,
    pub reject_reason_provided: bool,
    pub all_images_transferred: bool,
    pub export_retry_exhausted: bool,
    pub operator_authorized: bool,
    pub metadata: HashMap<String, String>,
}

impl GuardEvaluationContext {
    /// Convenience builder used by callers that only need to set a handful of fields;
    /// everything else defaults to `false`/empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
