//! Demonstration binary: wires mock adapters together through [`Engine`] and drives
//! a single-exposure study end to end, printing state-change events as they happen.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use workflow_engine::api::{Engine, PatientInfo};
use workflow_engine::config::EngineConfig;
use workflow_engine::events::WorkflowEvent;
use workflow_engine::executor::engine::Collaborators;
use workflow_engine::journal::writer::InMemoryJournal;
use workflow_engine::model::protocol::Protocol;
use workflow_engine::model::study::RejectReason;
use workflow_engine::ports::detector::AcquiredImage;
use workflow_engine::ports::mock::{
    MockAec, MockDetector, MockDoseTracker, MockHvg, MockMpps, MockSafety, MockStore, MockWorklist,
};
use workflow_engine::protocol_repo::ProtocolRepository;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(about = "Drives the clinical workflow engine through a single exposure study")]
struct Args {
    /// Reject the first exposure before accepting a retake.
    #[arg(long)]
    with_retake: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let collaborators = Collaborators {
        hvg: Arc::new(MockHvg::default()),
        detector: Arc::new(MockDetector::default()),
        safety: Arc::new(MockSafety::default()),
        aec: Arc::new(MockAec::default()),
        dose_tracker: Arc::new(MockDoseTracker::default()),
        worklist: Arc::new(MockWorklist::default()),
        mpps: Arc::new(MockMpps::default()),
        store: Arc::new(MockStore::new(0)),
    };

    let config = EngineConfig::default();
    let protocol_repo = Arc::new(ProtocolRepository::new(false));
    let engine = Engine::new_with_journal(
        config,
        collaborators.clone(),
        Box::new(InMemoryJournal::default()),
        protocol_repo,
    );

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let WorkflowEvent::StateChanged { from, to, trigger, .. } = event {
                println!("  [event] {from} --{trigger}--> {to}");
            }
        }
    });

    println!("-- starting worklist sync --");
    engine.start_worklist_sync(true, false).await;

    println!("-- confirming patient --");
    engine
        .confirm_patient(
            "operator1",
            PatientInfo {
                patient_id: "P001".into(),
                patient_name: "Doe^Jane".into(),
                birth_date: Some("19800101".into()),
                sex: Some("F".into()),
                worklist_item_uid: None,
            },
        )
        .await;

    println!("-- confirming protocol --");
    let mut protocol = Protocol::new("CHEST-PA-1", "CHEST", "PA", "DeviceX");
    protocol.kvp = 120.0;
    protocol.ma = 100.0;
    protocol.exposure_time_ms = 100.0;
    engine.confirm_protocol("operator1", protocol).await;

    println!("-- operator ready --");
    engine.ready_for_exposure("operator1").await;

    println!("-- triggering exposure --");
    engine.trigger_exposure().await.expect("exposure trigger");

    println!("   (engine now in state: {})", engine.current_state().await);

    let image = AcquiredImage {
        image_instance_uid: "IMG-001".into(),
        is_valid: true,
        byte_len: 4_194_304,
    };
    println!("-- reporting exposure complete --");
    // The demo does not track the study UID returned from earlier calls explicitly;
    // `on_exposure_complete` only needs it to key the dose tracker, which tolerates
    // an unrecognized key by starting a fresh accumulator.
    engine
        .on_exposure_complete("demo-study", image)
        .await
        .expect("exposure complete");

    if args.with_retake {
        println!("-- rejecting image for retake --");
        engine.reject_image("operator1", RejectReason::Motion).await;
        println!("-- approving retake --");
        engine.approve_retake("operator1").await;
        println!("-- (would re-confirm protocol and re-trigger exposure here) --");
    } else {
        println!("-- accepting image, no more exposures --");
        engine.accept_image("operator1", false).await;
    }

    println!("-- initiating export --");
    engine.initiate_export("operator1", true).await;

    // Give the detached PACS export follow-up a moment to land.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    println!("-- final state: {} --", engine.current_state().await);
}
