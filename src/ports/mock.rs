//! In-memory mock adapters for every capability port.
//!
//! These are not hardware or DICOM implementations; they exist so the executor,
//! guard matrix, and journal can be driven end-to-end in tests and in
//! `bin/engine_demo.rs`, shipping an in-memory stand-in alongside every real
//! driver trait.

use crate::error::{EngineError, EngineResult};
use crate::model::interlock::InterlockStatus;
use crate::model::protocol::Protocol;
use crate::model::study::StudyContext;
use crate::ports::aec::{AecPort, AecReadiness, RecommendedParams};
use crate::ports::detector::{AcquiredImage, DetectorPort, DetectorStatus};
use crate::ports::dicom::{MppsPort, StoreOutcome, StorePort, WorklistItem, WorklistPort};
use crate::ports::dose_tracker::DoseTrackerPort;
use crate::ports::hvg::{FaultStatus, HvgPort, ThermalStatus};
use crate::ports::safety_port::SafetyPort;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared, mutable interlock state a test can flip mid-scenario, e.g. dropping the
/// door-closed signal partway through an exposure.
#[derive(Clone)]
pub struct MockSafety {
    status: Arc<RwLock<InterlockStatus>>,
    standby_count: Arc<AtomicUsize>,
    callback: Arc<RwLock<Option<Box<dyn Fn(InterlockStatus) + Send + Sync>>>>,
}

impl Default for MockSafety {
    fn default() -> Self {
        Self {
            status: Arc::new(RwLock::new(InterlockStatus::all_clear())),
            standby_count: Arc::new(AtomicUsize::new(0)),
            callback: Arc::new(RwLock::new(None)),
        }
    }
}

impl MockSafety {
    /// Sets the live interlock snapshot and, if a callback is registered, invokes it
    /// — standing in for the asynchronous hardware notification path.
    pub fn set_status(&self, status: InterlockStatus) {
        *self.status.write() = status;
        if let Some(cb) = self.callback.read().as_ref() {
            cb(status);
        }
    }

    pub fn standby_count(&self) -> usize {
        self.standby_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SafetyPort for MockSafety {
    async fn check_all_interlocks(&self) -> EngineResult<InterlockStatus> {
        Ok(*self.status.read())
    }

    async fn emergency_standby(&self) -> EngineResult<()> {
        self.standby_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn register_interlock_callback(&self, callback: Box<dyn Fn(InterlockStatus) + Send + Sync>) {
        *self.callback.write() = Some(callback);
    }
}

#[derive(Clone)]
pub struct MockHvg {
    armed: Arc<AtomicBool>,
    aborted_count: Arc<AtomicUsize>,
    fault: Arc<RwLock<FaultStatus>>,
    thermal: Arc<RwLock<ThermalStatus>>,
}

impl Default for MockHvg {
    fn default() -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(false)),
            aborted_count: Arc::new(AtomicUsize::new(0)),
            fault: Arc::new(RwLock::new(FaultStatus::Ok)),
            thermal: Arc::new(RwLock::new(ThermalStatus::Normal)),
        }
    }
}

impl MockHvg {
    pub fn aborted_count(&self) -> usize {
        self.aborted_count.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn set_fault(&self, fault: FaultStatus) {
        *self.fault.write() = fault;
    }
}

#[async_trait]
impl HvgPort for MockHvg {
    async fn set_exposure_parameters(&self, _protocol: &Protocol) -> EngineResult<()> {
        Ok(())
    }

    async fn arm(&self) -> EngineResult<()> {
        self.armed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn trigger_exposure(&self) -> EngineResult<()> {
        if *self.fault.read() == FaultStatus::Fault {
            return Err(EngineError::HardwareError("generator fault".into()));
        }
        Ok(())
    }

    async fn abort_exposure(&self) -> EngineResult<()> {
        self.aborted_count.fetch_add(1, Ordering::SeqCst);
        self.armed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn get_fault_status(&self) -> EngineResult<FaultStatus> {
        Ok(*self.fault.read())
    }

    async fn get_thermal_status(&self) -> EngineResult<ThermalStatus> {
        Ok(*self.thermal.read())
    }
}

#[derive(Clone)]
pub struct MockDetector {
    status: Arc<RwLock<DetectorStatus>>,
    next_image: Arc<RwLock<Option<AcquiredImage>>>,
}

impl Default for MockDetector {
    fn default() -> Self {
        Self {
            status: Arc::new(RwLock::new(DetectorStatus::Ready)),
            next_image: Arc::new(RwLock::new(None)),
        }
    }
}

impl MockDetector {
    pub fn set_status(&self, status: DetectorStatus) {
        *self.status.write() = status;
    }

    pub fn queue_image(&self, image: AcquiredImage) {
        *self.next_image.write() = Some(image);
    }
}

#[async_trait]
impl DetectorPort for MockDetector {
    async fn start_acquisition(&self) -> EngineResult<()> {
        *self.status.write() = DetectorStatus::Acquiring;
        Ok(())
    }

    async fn get_status(&self) -> EngineResult<DetectorStatus> {
        Ok(*self.status.read())
    }

    async fn get_acquired_image(&self) -> EngineResult<AcquiredImage> {
        self.next_image
            .write()
            .take()
            .ok_or_else(|| EngineError::HardwareError("no image queued".into()))
    }
}

#[derive(Clone, Default)]
pub struct MockAec;

#[async_trait]
impl AecPort for MockAec {
    async fn set_parameters(&self, _protocol: &Protocol) -> EngineResult<()> {
        Ok(())
    }

    async fn get_readiness(&self) -> EngineResult<AecReadiness> {
        Ok(AecReadiness::Ready)
    }

    async fn get_recommended_params(&self) -> EngineResult<RecommendedParams> {
        Ok(RecommendedParams {
            kvp: 100.0,
            ma: 100.0,
        })
    }
}

#[derive(Clone, Default)]
pub struct MockDoseTracker {
    cumulative: Arc<RwLock<HashMap<String, f64>>>,
}

#[async_trait]
impl DoseTrackerPort for MockDoseTracker {
    async fn start_exposure(&self, study_instance_uid: &str) -> EngineResult<()> {
        self.cumulative
            .write()
            .entry(study_instance_uid.to_string())
            .or_insert(0.0);
        Ok(())
    }

    async fn stop_exposure(&self, study_instance_uid: &str) -> EngineResult<f64> {
        let mut entry = 0.7_f64;
        self.cumulative
            .write()
            .entry(study_instance_uid.to_string())
            .and_modify(|d| {
                *d += entry;
                entry = *d;
            })
            .or_insert(entry);
        Ok(entry)
    }

    async fn record_rejected(&self, study_instance_uid: &str, dap: f64) -> EngineResult<()> {
        *self
            .cumulative
            .write()
            .entry(study_instance_uid.to_string())
            .or_insert(0.0) += dap;
        Ok(())
    }

    async fn finalize_study(&self, _study_instance_uid: &str) -> EngineResult<()> {
        Ok(())
    }

    async fn get_cumulative(&self, study_instance_uid: &str) -> EngineResult<f64> {
        Ok(*self
            .cumulative
            .read()
            .get(study_instance_uid)
            .unwrap_or(&0.0))
    }

    async fn check_within_limits(&self, study_instance_uid: &str) -> EngineResult<bool> {
        Ok(self.get_cumulative(study_instance_uid).await? < 1000.0)
    }
}

#[derive(Clone, Default)]
pub struct MockWorklist {
    items: Arc<RwLock<Vec<WorklistItem>>>,
}

impl MockWorklist {
    pub fn push(&self, item: WorklistItem) {
        self.items.write().push(item);
    }
}

#[async_trait]
impl WorklistPort for MockWorklist {
    async fn query(&self) -> EngineResult<Vec<WorklistItem>> {
        Ok(self.items.read().clone())
    }
}

#[derive(Clone, Default)]
pub struct MockMpps {
    completed: Arc<AtomicUsize>,
    discontinued: Arc<AtomicUsize>,
}

impl MockMpps {
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn discontinued_count(&self) -> usize {
        self.discontinued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MppsPort for MockMpps {
    async fn create(&self, _study: &StudyContext) -> EngineResult<()> {
        Ok(())
    }

    async fn set_completed(&self, _study: &StudyContext) -> EngineResult<()> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_discontinued(&self, _study: &StudyContext, _reason: &str) -> EngineResult<()> {
        self.discontinued.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A store adapter that fails deterministically for the first `fail_times` calls per
/// image, then succeeds — used to drive the bounded-retry / non-blocking PACS
/// scenario.
#[derive(Clone)]
pub struct MockStore {
    fail_times: usize,
    attempts: Arc<RwLock<HashMap<String, usize>>>,
}

impl MockStore {
    pub fn new(fail_times: usize) -> Self {
        Self {
            fail_times,
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl StorePort for MockStore {
    async fn store_image(&self, image_instance_uid: &str) -> EngineResult<StoreOutcome> {
        let mut attempts = self.attempts.write();
        let count = attempts.entry(image_instance_uid.to_string()).or_insert(0);
        *count += 1;
        if *count <= self.fail_times {
            Ok(StoreOutcome::Queued)
        } else {
            Ok(StoreOutcome::Stored)
        }
    }
}
