//! End-to-end scenario tests driven entirely through [`Engine`], the same
//! surface a real console integration would use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use workflow_engine::api::{Engine, PatientInfo};
use workflow_engine::config::EngineConfig;
use workflow_engine::executor::engine::Collaborators;
use workflow_engine::journal::entry::{JournalCategory, WorkflowJournalEntry};
use workflow_engine::journal::writer::{FileJournal, InMemoryJournal, Journal};
use workflow_engine::model::interlock::InterlockStatus;
use workflow_engine::model::protocol::Protocol;
use workflow_engine::model::state::{Trigger, WorkflowState};
use workflow_engine::model::study::{RejectReason, StudyContext};
use workflow_engine::model::transition::TransitionResult;
use workflow_engine::ports::detector::AcquiredImage;
use workflow_engine::ports::mock::{
    MockAec, MockDetector, MockDoseTracker, MockHvg, MockMpps, MockSafety, MockStore, MockWorklist,
};
use workflow_engine::protocol_repo::ProtocolRepository;

fn nominal_protocol() -> Protocol {
    let mut p = Protocol::new("CHEST-PA-1", "CHEST", "PA", "DeviceX");
    p.kvp = 120.0;
    p.ma = 100.0;
    p.exposure_time_ms = 100.0;
    p
}

struct Harness {
    engine: Engine,
    safety: Arc<MockSafety>,
    hvg: Arc<MockHvg>,
    #[allow(dead_code)]
    detector: Arc<MockDetector>,
}

fn harness_with(config: EngineConfig, fail_store_times: usize) -> Harness {
    let safety = Arc::new(MockSafety::default());
    let hvg = Arc::new(MockHvg::default());
    let detector = Arc::new(MockDetector::default());
    let collaborators = Collaborators {
        hvg: hvg.clone(),
        detector: detector.clone(),
        safety: safety.clone(),
        aec: Arc::new(MockAec::default()),
        dose_tracker: Arc::new(MockDoseTracker::default()),
        worklist: Arc::new(MockWorklist::default()),
        mpps: Arc::new(MockMpps::default()),
        store: Arc::new(MockStore::new(fail_store_times)),
    };
    let engine = Engine::new_with_journal(
        config,
        collaborators,
        Box::new(InMemoryJournal::default()),
        Arc::new(ProtocolRepository::new(false)),
    );
    Harness {
        engine,
        safety,
        hvg,
        detector,
    }
}

fn fast_poll_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.mid_exposure_poll_ms = 10;
    config
}

async fn wait_until_state(engine: &Engine, target: WorkflowState, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if engine.current_state().await == target {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for state {target}, still {}", engine.current_state().await);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Scenario 1: a normal single-exposure study, start to finish.
#[tokio::test]
async fn scenario_1_normal_single_exposure_study() {
    let h = harness_with(EngineConfig::default(), 0);
    let engine = &h.engine;

    let r = engine.start_worklist_sync(true, false).await;
    assert!(r.is_success());
    wait_until_state(engine, WorkflowState::PatientSelect, Duration::from_millis(500)).await;

    let r = engine
        .confirm_patient(
            "op1",
            PatientInfo {
                patient_id: "P001".into(),
                patient_name: "Doe^Jane".into(),
                birth_date: None,
                sex: None,
                worklist_item_uid: None,
            },
        )
        .await;
    assert!(r.is_success());

    let r = engine.confirm_protocol("op1", nominal_protocol()).await;
    assert!(r.is_success());

    let r = engine.ready_for_exposure("op1").await;
    assert!(r.is_success());
    assert_eq!(engine.current_state().await, WorkflowState::ExposureTrigger);

    engine.trigger_exposure().await.expect("trigger succeeds");

    let image = AcquiredImage {
        image_instance_uid: "IMG-1".into(),
        is_valid: true,
        byte_len: 1024,
    };
    let r = engine.on_exposure_complete("uid-1", image).await.expect("complete");
    assert!(r.is_success());
    assert_eq!(engine.current_state().await, WorkflowState::QcReview);

    let r = engine.accept_image("op1", false).await;
    assert!(r.is_success());
    assert_eq!(engine.current_state().await, WorkflowState::MppsComplete);

    let r = engine.initiate_export("op1", true).await;
    assert!(r.is_success());
    wait_until_state(engine, WorkflowState::Idle, Duration::from_millis(500)).await;
    assert_eq!(h.hvg.aborted_count(), 0);
}

/// Scenario 2: an interlock (door) opens mid-exposure; the monitor aborts the
/// generator and routes the study to `QcReview` as an incomplete exposure.
#[tokio::test]
async fn scenario_2_door_opens_mid_exposure() {
    let h = harness_with(fast_poll_config(), 0);
    let engine = &h.engine;

    engine.start_worklist_sync(true, false).await;
    wait_until_state(engine, WorkflowState::PatientSelect, Duration::from_millis(500)).await;
    engine
        .confirm_patient(
            "op1",
            PatientInfo {
                patient_id: "P002".into(),
                patient_name: "Roe^Rick".into(),
                birth_date: None,
                sex: None,
                worklist_item_uid: None,
            },
        )
        .await;
    engine.confirm_protocol("op1", nominal_protocol()).await;
    engine.ready_for_exposure("op1").await;
    assert_eq!(engine.current_state().await, WorkflowState::ExposureTrigger);

    let mut opened = InterlockStatus::all_clear();
    opened.door_closed = false;
    h.safety.set_status(opened);

    wait_until_state(engine, WorkflowState::QcReview, Duration::from_millis(1000)).await;
    assert_eq!(h.hvg.aborted_count(), 1);
    assert!(!h.hvg.is_armed());
}

/// Scenario 3: an out-of-range protocol is rejected by guards, journaled, and the
/// study stays in `ProtocolSelect`.
#[tokio::test]
async fn scenario_3_parameter_rejection_does_not_advance_state() {
    let h = harness_with(EngineConfig::default(), 0);
    let engine = &h.engine;

    engine.start_worklist_sync(true, false).await;
    wait_until_state(engine, WorkflowState::PatientSelect, Duration::from_millis(500)).await;
    engine
        .confirm_patient(
            "op1",
            PatientInfo {
                patient_id: "P003".into(),
                patient_name: "Zed^Zoe".into(),
                birth_date: None,
                sex: None,
                worklist_item_uid: None,
            },
        )
        .await;

    let mut bad_protocol = nominal_protocol();
    bad_protocol.kvp = 200.0; // exceeds the default device limit of 150
    let result = engine.confirm_protocol("op1", bad_protocol).await;
    match result {
        TransitionResult::GuardFailed { failed_guards, .. } => {
            assert!(failed_guards.contains(&"ExposureParamsOutOfRange".to_string()));
        }
        other => panic!("expected GuardFailed, got {other:?}"),
    }
    assert_eq!(engine.current_state().await, WorkflowState::ProtocolSelect);
}

/// Scenario 4: an emergency study is started without a worklist match, then
/// reconciled with a worklist item discovered later — without re-acquisition.
#[test]
fn scenario_4_emergency_study_reconciles_with_worklist_item_later() {
    use workflow_engine::ports::dicom::WorklistItem;

    let mut study = StudyContext::new_emergency("uid-emg-1".into(), "TEMP-001".into(), String::new());
    assert!(study.is_emergency);
    assert!(study.worklist_item_uid.is_none());

    let item = WorklistItem {
        worklist_item_uid: "WL-99".into(),
        accession_number: "ACC-99".into(),
        patient_id: "TEMP-001".into(),
        patient_name: "Doe^John".into(),
        scheduled_procedure_codes: vec!["RPID1".into()],
    };
    ProtocolRepository::reconcile_emergency_study(&mut study, &item);

    assert_eq!(study.worklist_item_uid.as_deref(), Some("WL-99"));
    assert_eq!(study.accession_number, "ACC-99");
    assert_eq!(study.patient_name, "Doe^John");
    assert_eq!(study.study_instance_uid, "uid-emg-1", "no re-acquisition: identity is unchanged");
}

/// Scenario 5: a crash is recovered from a non-idle journal tail. Hardware is
/// commanded to standby before the engine is usable again, and it always boots
/// back into `Idle`.
#[tokio::test]
async fn scenario_5_crash_recovery_forces_standby_and_boots_idle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("journal.ndjson");
    {
        let mut journal = FileJournal::new(&path, Default::default());
        journal
            .append(&WorkflowJournalEntry::new(
                WorkflowState::PositionAndPreview,
                WorkflowState::ExposureTrigger,
                Trigger::OperatorReady,
                vec![],
                Some("op1".into()),
                Some("uid-crash-1".into()),
                JournalCategory::Safety,
                HashMap::new(),
            ))
            .await
            .expect("append");
    }

    let mut config = EngineConfig::default();
    config.journal.path = path;

    let safety = Arc::new(MockSafety::default());
    let hvg = Arc::new(MockHvg::default());
    let collaborators = Collaborators {
        hvg: hvg.clone(),
        detector: Arc::new(MockDetector::default()),
        safety: safety.clone(),
        aec: Arc::new(MockAec::default()),
        dose_tracker: Arc::new(MockDoseTracker::default()),
        worklist: Arc::new(MockWorklist::default()),
        mpps: Arc::new(MockMpps::default()),
        store: Arc::new(MockStore::new(0)),
    };

    let (engine, report) = Engine::bootstrap(config, collaborators)
        .await
        .expect("bootstrap recovers cleanly");

    assert_eq!(report.last_state, WorkflowState::ExposureTrigger);
    assert_eq!(report.recovered_study_instance_uid.as_deref(), Some("uid-crash-1"));
    assert!(report.emergency_sequence_ran);
    assert_eq!(hvg.aborted_count(), 1);
    assert_eq!(safety.standby_count(), 1);
    assert_eq!(engine.current_state().await, WorkflowState::Idle);
}

/// Scenario 6: PACS export exhausts its retries for every image, but the study
/// still closes at `Idle` rather than blocking there.
#[tokio::test]
async fn scenario_6_pacs_failure_is_non_blocking() {
    let h = harness_with(EngineConfig::default(), 999);
    let engine = &h.engine;

    engine.start_worklist_sync(true, false).await;
    wait_until_state(engine, WorkflowState::PatientSelect, Duration::from_millis(500)).await;
    engine
        .confirm_patient(
            "op1",
            PatientInfo {
                patient_id: "P006".into(),
                patient_name: "Fox^Fiona".into(),
                birth_date: None,
                sex: None,
                worklist_item_uid: None,
            },
        )
        .await;
    engine.confirm_protocol("op1", nominal_protocol()).await;
    engine.ready_for_exposure("op1").await;
    engine.trigger_exposure().await.expect("trigger succeeds");

    let image = AcquiredImage {
        image_instance_uid: "IMG-6".into(),
        is_valid: true,
        byte_len: 2048,
    };
    engine.on_exposure_complete("uid-6", image).await.expect("complete");
    engine.accept_image("op1", false).await;
    engine.initiate_export("op1", true).await;

    wait_until_state(engine, WorkflowState::Idle, Duration::from_millis(1000)).await;
}

/// An operator abort during an armed exposure must abort the generator before the
/// study is dropped, and must report MPPS-discontinued for the study.
#[tokio::test]
async fn abort_from_exposure_trigger_aborts_hardware_and_boots_idle() {
    let h = harness_with(EngineConfig::default(), 0);
    let engine = &h.engine;

    engine.start_worklist_sync(true, false).await;
    wait_until_state(engine, WorkflowState::PatientSelect, Duration::from_millis(500)).await;
    engine
        .confirm_patient(
            "op1",
            PatientInfo {
                patient_id: "P008".into(),
                patient_name: "Vale^Vic".into(),
                birth_date: None,
                sex: None,
                worklist_item_uid: None,
            },
        )
        .await;
    engine.confirm_protocol("op1", nominal_protocol()).await;
    engine.ready_for_exposure("op1").await;
    assert_eq!(engine.current_state().await, WorkflowState::ExposureTrigger);

    let r = engine.abort_study("op1").await;
    assert!(r.is_success());
    wait_until_state(engine, WorkflowState::Idle, Duration::from_millis(500)).await;
    assert_eq!(h.hvg.aborted_count(), 1);
    assert_eq!(h.safety.standby_count(), 1);
}

/// A rejected image sends the study through `RejectRetake` back to
/// `PositionAndPreview` for a retake, reusing the rejected exposure's protocol.
#[tokio::test]
async fn reject_then_retake_returns_to_position_and_preview() {
    let h = harness_with(EngineConfig::default(), 0);
    let engine = &h.engine;

    engine.start_worklist_sync(true, false).await;
    wait_until_state(engine, WorkflowState::PatientSelect, Duration::from_millis(500)).await;
    engine
        .confirm_patient(
            "op1",
            PatientInfo {
                patient_id: "P007".into(),
                patient_name: "Kane^Kim".into(),
                birth_date: None,
                sex: None,
                worklist_item_uid: None,
            },
        )
        .await;
    engine.confirm_protocol("op1", nominal_protocol()).await;
    engine.ready_for_exposure("op1").await;
    engine.trigger_exposure().await.expect("trigger succeeds");

    let image = AcquiredImage {
        image_instance_uid: "IMG-7".into(),
        is_valid: true,
        byte_len: 2048,
    };
    engine.on_exposure_complete("uid-7", image).await.expect("complete");

    let r = engine.reject_image("op1", RejectReason::Motion).await;
    assert!(r.is_success());
    assert_eq!(engine.current_state().await, WorkflowState::RejectRetake);

    let r = engine.approve_retake("op1").await;
    assert!(r.is_success());
    assert_eq!(engine.current_state().await, WorkflowState::PositionAndPreview);
}
