//! Named guard predicates evaluated against a [`GuardEvaluationContext`].
//!
//! Each guard's `name` is what gets reported back to the caller and journaled when
//! the guard fails,
//! so names describe the *failure* condition a passing guard rules out, not the raw
//! context field it reads.

use crate::model::context::GuardEvaluationContext;

/// A single named, pure predicate over the guard evaluation context.
#[derive(Clone, Copy)]
pub struct Guard {
    pub name: &'static str,
    pub check: fn(&GuardEvaluationContext) -> bool,
}

impl Guard {
    pub const fn new(name: &'static str, check: fn(&GuardEvaluationContext) -> bool) -> Self {
        Self { name, check }
    }
}

pub const NETWORK_REACHABLE_OR_SYNC_DUE: Guard = Guard::new("NetworkReachableOrSyncIntervalElapsed", |ctx| {
    ctx.network_reachable || ctx.auto_sync_interval_elapsed
});

pub const HARDWARE_INTERLOCK_OK: Guard =
    Guard::new("HardwareInterlockFailed", |ctx| ctx.hardware_interlock_ok);

pub const WORKLIST_RETRY_EXHAUSTED: Guard =
    Guard::new("WorklistRetryNotExhausted", |ctx| ctx.worklist_retry_exhausted);

pub const PATIENT_ID_NOT_EMPTY: Guard =
    Guard::new("PatientIdEmpty", |ctx| ctx.patient_id_non_empty);

pub const PROTOCOL_VALID: Guard = Guard::new("ProtocolInvalid", |ctx| ctx.protocol_valid);

pub const EXPOSURE_PARAMS_IN_SAFE_RANGE: Guard =
    Guard::new("ExposureParamsOutOfRange", |ctx| ctx.exposure_params_in_safe_range);

pub const DETECTOR_READY: Guard = Guard::new("DetectorNotReady", |ctx| ctx.detector_ready);

pub const IMAGE_DATA_VALID: Guard = Guard::new("ImageDataInvalid", |ctx| ctx.image_data_valid);

pub const STUDY_HAS_NO_MORE_EXPOSURES: Guard =
    Guard::new("StudyHasMoreExposures", |ctx| !ctx.study_has_more_exposures);

pub const STUDY_HAS_MORE_EXPOSURES: Guard =
    Guard::new("StudyHasNoMoreExposures", |ctx| ctx.study_has_more_exposures);

pub const REJECT_REASON_PROVIDED: Guard =
    Guard::new("RejectReasonRequired", |ctx| ctx.reject_reason_provided);

pub const STUDY_HAS_IMAGES: Guard = Guard::new("StudyHasNoImages", |ctx| ctx.study_has_images);

pub const ALL_IMAGES_TRANSFERRED: Guard =
    Guard::new("NotAllImagesTransferred", |ctx| ctx.all_images_transferred);

pub const EXPORT_RETRY_EXHAUSTED: Guard =
    Guard::new("ExportRetryNotExhausted", |ctx| ctx.export_retry_exhausted);

pub const OPERATOR_AUTHORIZED: Guard =
    Guard::new("OperatorNotAuthorized", |ctx| ctx.operator_authorized);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposure_params_guard_fails_out_of_range() {
        let mut ctx = GuardEvaluationContext::new();
        ctx.exposure_params_in_safe_range = false;
        assert!(!(EXPOSURE_PARAMS_IN_SAFE_RANGE.check)(&ctx));
    }

    #[test]
    fn more_and_no_more_exposure_guards_are_complementary() {
        let mut ctx = GuardEvaluationContext::new();
        ctx.study_has_more_exposures = true;
        assert!((STUDY_HAS_MORE_EXPOSURES.check)(&ctx));
        assert!(!(STUDY_HAS_NO_MORE_EXPOSURES.check)(&ctx));
    }
}
