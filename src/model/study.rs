//! The active study: patient identity, and the ordered list of exposures taken for it.

use crate::model::protocol::Protocol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies and tracks the study currently being worked.
///
/// Created at `PatientSelect` entry, mutated by the executor and the exposure
/// handler, and cleared (patient-identifying fields dropped) on return to `Idle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyContext {
    pub study_instance_uid: String,
    pub accession_number: String,
    pub patient_id: String,
    pub patient_name: String,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub is_emergency: bool,
    pub worklist_item_uid: Option<String>,
    /// 1-based ordered list; index 0 is never used.
    pub exposure_series: Vec<ExposureRecord>,
    pub created_at: DateTime<Utc>,
}

impl StudyContext {
    pub fn new(study_instance_uid: String, accession_number: String, patient_id: String) -> Self {
        Self {
            study_instance_uid,
            accession_number,
            patient_id,
            patient_name: String::new(),
            birth_date: None,
            sex: None,
            is_emergency: false,
            worklist_item_uid: None,
            exposure_series: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A locally-generated emergency study: no worklist item exists yet. The
    /// accession number is synthesized from the study UID.
    pub fn new_emergency(
        study_instance_uid: String,
        patient_id: String,
        patient_name: String,
    ) -> Self {
        let mut ctx = Self::new(
            study_instance_uid.clone(),
            format!("EMG-{}", &study_instance_uid[..study_instance_uid.len().min(8)]),
            patient_id,
        );
        ctx.patient_name = patient_name;
        ctx.is_emergency = true;
        ctx
    }

    pub fn has_images(&self) -> bool {
        self.exposure_series
            .iter()
            .any(|e| matches!(e.status, ExposureStatus::Accepted))
    }

    /// Whether at least one more exposure remains to be acquired in this study.
    /// Left to the operator-driven workflow: a study "has more exposures" as long as
    /// the most recent exposure has not been marked as the last of the series by the
    /// caller supplying `has_more = false` to `accept_image`.
    pub fn next_index(&self) -> usize {
        self.exposure_series.len() + 1
    }

    /// Cumulative planned DAP is not tracked here (owned by the dose tracker port);
    /// this only reports whether any rejected exposure exists, since rejected dose
    /// still counts toward the study total.
    pub fn has_rejected_exposures(&self) -> bool {
        self.exposure_series
            .iter()
            .any(|e| matches!(e.status, ExposureStatus::Rejected))
    }

    /// Strip patient-identifying fields, keeping only a non-identifying summary, per
    /// the `Idle`-entry handler's duty to clear identity on return to standby.
    pub fn anonymized_summary(&self) -> StudySummary {
        StudySummary {
            study_instance_uid: self.study_instance_uid.clone(),
            exposure_count: self.exposure_series.len(),
            was_emergency: self.is_emergency,
        }
    }
}

/// What remains of a [`StudyContext`] after the patient leaves the system: no name,
/// no identifiers, only what is needed for dose/throughput reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySummary {
    pub study_instance_uid: String,
    pub exposure_count: usize,
    pub was_emergency: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureStatus {
    Pending,
    Acquired,
    Accepted,
    Rejected,
    Incomplete,
}

/// A structured reject reason, required whenever an image is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    Motion,
    Positioning,
    ExposureError,
    EquipmentArtifact,
    Other,
}

/// One acquisition attempt within a study's exposure series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub index: usize,
    pub protocol_snapshot: Protocol,
    pub status: ExposureStatus,
    pub reject_reason: Option<RejectReason>,
    pub image_instance_uid: Option<String>,
    pub administered_dap: Option<f64>,
    pub acquired_at: Option<DateTime<Utc>>,
    pub operator_id: String,
}

impl ExposureRecord {
    pub fn new(index: usize, protocol_snapshot: Protocol, operator_id: impl Into<String>) -> Self {
        Self {
            index,
            protocol_snapshot,
            status: ExposureStatus::Pending,
            reject_reason: None,
            image_instance_uid: None,
            administered_dap: None,
            acquired_at: None,
            operator_id: operator_id.into(),
        }
    }
}
