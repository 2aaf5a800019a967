//! The public, coarse-grained facade: one method per
//! clinical trigger, plus the two commands (`trigger_exposure`, crash recovery) that
//! sit outside the finite state machine itself.
//!
//! Internally this is a thin wrapper around an [`EngineHandle`] and the raw
//! collaborator ports — callers never see [`crate::model::transition::TransitionRequest`]
//! or the guard matrix directly.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::WorkflowEventBus;
use crate::executor::engine::{Collaborators, EngineHandle, WorkflowExecutor};
use crate::journal::entry::{JournalCategory, WorkflowJournalEntry};
use crate::journal::recovery::{RecoveryReport, RecoveryService};
use crate::journal::writer::{FileJournal, Journal};
use crate::model::context::GuardEvaluationContext;
use crate::model::protocol::Protocol;
use crate::model::state::{Trigger, WorkflowState};
use crate::model::study::RejectReason;
use crate::model::transition::{TransitionPayload, TransitionRequest, TransitionResult};
use crate::ports::detector::AcquiredImage;
use crate::protocol_repo::ProtocolRepository;
use crate::safety::emergency::EmergencySequencer;
use crate::safety::parameters;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Deserialize, Default)]
struct ProtocolFile {
    #[serde(default)]
    protocols: Vec<Protocol>,
}

async fn load_protocol_repository(config: &EngineConfig) -> ProtocolRepository {
    let fuzzy = config.procedure_mapping.fuzzy;
    match tokio::fs::read_to_string(&config.protocol_db_path).await {
        Ok(contents) => match toml::from_str::<ProtocolFile>(&contents) {
            Ok(file) => ProtocolRepository::load(file.protocols, fuzzy),
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse protocol database; starting empty");
                ProtocolRepository::new(fuzzy)
            }
        },
        Err(_) => ProtocolRepository::new(fuzzy),
    }
}

/// Patient identity supplied by the operator or resolved from a worklist match.
#[derive(Debug, Clone)]
pub struct PatientInfo {
    pub patient_id: String,
    pub patient_name: String,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub worklist_item_uid: Option<String>,
}

/// The running engine: a handle to the executor task plus the collaborator ports the
/// facade needs for commands that sit outside the transition matrix.
pub struct Engine {
    handle: EngineHandle,
    collaborators: Collaborators,
    config: EngineConfig,
    protocol_repo: Arc<ProtocolRepository>,
    events: WorkflowEventBus,
}

impl Engine {
    /// Boots the engine: runs crash recovery against the existing journal (if any),
    /// then spawns the executor starting from `Idle` regardless of what state the
    /// journal's tail names — hardware is never auto-resumed.
    pub async fn bootstrap(
        config: EngineConfig,
        collaborators: Collaborators,
    ) -> EngineResult<(Self, RecoveryReport)> {
        let protocol_repo = Arc::new(load_protocol_repository(&config).await);
        let mut journal = FileJournal::new(config.journal.path.clone(), config.journal.retention.clone());

        let emergency = EmergencySequencer::new(collaborators.hvg.clone(), collaborators.safety.clone());
        let recovery_service = RecoveryService::new(&journal, emergency);
        let report = recovery_service
            .recover(config.crash_recovery_deadline())
            .await?;
        info!(
            last_state = %report.last_state,
            entries_read = report.entries_read,
            "crash recovery complete"
        );

        if report.emergency_sequence_ran {
            let recovery_entry = WorkflowJournalEntry::new(
                report.last_state,
                WorkflowState::Idle,
                Trigger::CriticalHardwareError,
                Vec::new(),
                None,
                report.recovered_study_instance_uid.clone(),
                JournalCategory::Safety,
                HashMap::from([(
                    "recovery_entries_read".to_string(),
                    report.entries_read.to_string(),
                )]),
            );
            if let Err(err) = journal.append(&recovery_entry).await {
                warn!(error = %err, "failed to journal crash-recovery action");
            }
        }

        let events = WorkflowEventBus::default();
        let (handle, _join) = WorkflowExecutor::spawn(
            WorkflowState::Idle,
            None,
            Box::new(journal),
            events.clone(),
            collaborators.clone(),
            config.clone(),
            protocol_repo.clone(),
        );

        Ok((
            Self {
                handle,
                collaborators,
                config,
                protocol_repo,
                events,
            },
            report,
        ))
    }

    /// Builds an engine around an already-open journal and a fresh `Idle` state,
    /// skipping recovery — used by tests and `bin/engine_demo.rs`.
    pub fn new_with_journal(
        config: EngineConfig,
        collaborators: Collaborators,
        journal: Box<dyn Journal>,
        protocol_repo: Arc<ProtocolRepository>,
    ) -> Self {
        let events = WorkflowEventBus::default();
        let (handle, _join) = WorkflowExecutor::spawn(
            WorkflowState::Idle,
            None,
            journal,
            events.clone(),
            collaborators.clone(),
            config.clone(),
            protocol_repo.clone(),
        );
        Self {
            handle,
            collaborators,
            config,
            protocol_repo,
            events,
        }
    }

    pub fn protocol_repository(&self) -> &ProtocolRepository {
        &self.protocol_repo
    }

    pub async fn current_state(&self) -> WorkflowState {
        self.handle.current_state().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<crate::events::WorkflowEvent> {
        self.events.subscribe()
    }

    pub async fn start_worklist_sync(
        &self,
        network_reachable: bool,
        auto_sync_interval_elapsed: bool,
    ) -> TransitionResult {
        let mut ctx = GuardEvaluationContext::new();
        ctx.network_reachable = network_reachable;
        ctx.auto_sync_interval_elapsed = auto_sync_interval_elapsed;
        self.handle
            .submit(TransitionRequest::new(Trigger::WorklistSyncRequested, ctx))
            .await
    }

    pub async fn start_emergency_workflow(
        &self,
        operator_id: impl Into<String>,
        patient_id: impl Into<String>,
        patient_name: impl Into<String>,
    ) -> TransitionResult {
        let payload = TransitionPayload::Patient {
            patient_id: patient_id.into(),
            patient_name: patient_name.into(),
            birth_date: None,
            sex: None,
            worklist_item_uid: None,
            is_emergency: true,
        };
        self.handle
            .submit(
                TransitionRequest::new(Trigger::EmergencyWorkflowRequested, GuardEvaluationContext::new())
                    .with_operator(operator_id)
                    .with_payload(payload),
            )
            .await
    }

    pub async fn confirm_patient(
        &self,
        operator_id: impl Into<String>,
        patient: PatientInfo,
    ) -> TransitionResult {
        let mut ctx = GuardEvaluationContext::new();
        ctx.patient_id_non_empty = !patient.patient_id.is_empty();
        let payload = TransitionPayload::Patient {
            patient_id: patient.patient_id,
            patient_name: patient.patient_name,
            birth_date: patient.birth_date,
            sex: patient.sex,
            worklist_item_uid: patient.worklist_item_uid,
            is_emergency: false,
        };
        self.handle
            .submit(
                TransitionRequest::new(Trigger::PatientConfirmed, ctx)
                    .with_operator(operator_id)
                    .with_payload(payload),
            )
            .await
    }

    pub async fn confirm_protocol(
        &self,
        operator_id: impl Into<String>,
        protocol: Protocol,
    ) -> TransitionResult {
        let validation = parameters::validate(&protocol, &self.config.device_safety_limits);
        let mut ctx = GuardEvaluationContext::new();
        ctx.protocol_valid = protocol.is_active;
        ctx.exposure_params_in_safe_range = validation.is_valid();
        self.handle
            .submit(
                TransitionRequest::new(Trigger::ProtocolConfirmed, ctx)
                    .with_operator(operator_id)
                    .with_payload(TransitionPayload::Protocol(protocol)),
            )
            .await
    }

    pub async fn ready_for_exposure(&self, operator_id: impl Into<String>) -> TransitionResult {
        self.handle
            .submit(
                TransitionRequest::new(Trigger::OperatorReady, GuardEvaluationContext::new())
                    .with_operator(operator_id),
            )
            .await
    }

    /// Commands the generator to fire. Sits outside the transition matrix: entering
    /// `ExposureTrigger` means armed-and-ready, not beam-on. A hardware failure here
    /// is routed through the `CriticalHardwareError` transition rather than just
    /// returned, since the generator may now be in an indeterminate state.
    ///
    /// The gap between receiving this command and issuing it to the generator and
    /// detector is measured against `exposure_trigger_latency_budget_ms`; exceeding
    /// it under nominal load is logged, not treated as a failure.
    pub async fn trigger_exposure(&self) -> EngineResult<()> {
        let started = std::time::Instant::now();

        if let Err(err) = self.collaborators.hvg.trigger_exposure().await {
            self.handle
                .submit(TransitionRequest::new(
                    Trigger::CriticalHardwareError,
                    GuardEvaluationContext::new(),
                ))
                .await;
            return Err(err);
        }
        self.collaborators.detector.start_acquisition().await?;

        let elapsed = started.elapsed();
        let budget = self.config.exposure_trigger_latency_budget();
        if elapsed > budget {
            warn!(elapsed_ms = elapsed.as_millis(), budget_ms = budget.as_millis(), "exposure trigger latency exceeded budget");
        } else {
            info!(elapsed_ms = elapsed.as_millis(), "exposure trigger latency");
        }
        Ok(())
    }

    /// Reports a completed acquisition. `study_instance_uid` identifies the dose
    /// accumulator to stop; callers already hold it from the patient/protocol
    /// confirmation steps.
    pub async fn on_exposure_complete(
        &self,
        study_instance_uid: &str,
        image: AcquiredImage,
    ) -> EngineResult<TransitionResult> {
        let administered_dap = self
            .collaborators
            .dose_tracker
            .stop_exposure(study_instance_uid)
            .await?;
        let mut ctx = GuardEvaluationContext::new();
        ctx.image_data_valid = image.is_valid;
        Ok(self
            .handle
            .submit(
                TransitionRequest::new(Trigger::AcquisitionComplete, ctx).with_payload(
                    TransitionPayload::AcquiredImage {
                        image,
                        administered_dap,
                    },
                ),
            )
            .await)
    }

    pub async fn accept_image(&self, operator_id: impl Into<String>, has_more: bool) -> TransitionResult {
        let mut ctx = GuardEvaluationContext::new();
        ctx.study_has_more_exposures = has_more;
        self.handle
            .submit(
                TransitionRequest::new(Trigger::ImageAccepted, ctx)
                    .with_operator(operator_id)
                    .with_payload(TransitionPayload::HasMoreExposures(has_more)),
            )
            .await
    }

    pub async fn reject_image(
        &self,
        operator_id: impl Into<String>,
        reason: RejectReason,
    ) -> TransitionResult {
        let mut ctx = GuardEvaluationContext::new();
        ctx.reject_reason_provided = true;
        self.handle
            .submit(
                TransitionRequest::new(Trigger::ImageRejected, ctx)
                    .with_operator(operator_id)
                    .with_payload(TransitionPayload::Reject { reason }),
            )
            .await
    }

    pub async fn approve_retake(&self, operator_id: impl Into<String>) -> TransitionResult {
        self.handle
            .submit(
                TransitionRequest::new(Trigger::RetakeApproved, GuardEvaluationContext::new())
                    .with_operator(operator_id),
            )
            .await
    }

    pub async fn cancel_retake(&self, operator_id: impl Into<String>) -> TransitionResult {
        self.handle
            .submit(
                TransitionRequest::new(Trigger::RetakeCancelled, GuardEvaluationContext::new())
                    .with_operator(operator_id),
            )
            .await
    }

    pub async fn initiate_export(
        &self,
        operator_id: impl Into<String>,
        study_has_images: bool,
    ) -> TransitionResult {
        let mut ctx = GuardEvaluationContext::new();
        ctx.study_has_images = study_has_images;
        self.handle
            .submit(
                TransitionRequest::new(Trigger::ExportInitiated, ctx).with_operator(operator_id),
            )
            .await
    }

    pub async fn abort_study(&self, operator_id: impl Into<String>) -> TransitionResult {
        let mut ctx = GuardEvaluationContext::new();
        ctx.operator_authorized = true;
        self.handle
            .submit(
                TransitionRequest::new(Trigger::StudyAbortRequested, ctx).with_operator(operator_id),
            )
            .await
    }
}

impl From<EngineError> for TransitionResult {
    fn from(error: EngineError) -> Self {
        TransitionResult::Errored {
            state: WorkflowState::Idle,
            error,
        }
    }
}
