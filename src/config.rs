//! Engine configuration, loaded via `figment` layered over `config.toml` and
//! `ENGINE_`-prefixed environment variables.
//!
//! Every site-specific clinical policy decision is resolved here as an explicit,
//! documented field rather than hard-coded behavior.

use crate::error::{EngineError, EngineResult};
use crate::model::protocol::DeviceSafetyLimits;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Journal retention policy (Open Question c).
///
/// Defaults to `Keep`: clinical journals are regulatory records and are never
/// silently discarded. Rotation, when configured, renames the sealed segment with a
/// timestamp suffix instead of deleting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetentionPolicy {
    Keep,
    RotateAfterBytes { max_bytes: u64 },
    RotateAfterDays { max_days: u32 },
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::Keep
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorklistConfig {
    #[serde(default = "default_worklist_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_retries")]
    pub max_retries: u32,
}

/// Procedure-code -> protocol mapping behavior (Open Question d).
///
/// Defaults to exact-match only; fuzzy matching is an explicit opt-in, never an
/// implicit clinical policy decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureMappingConfig {
    #[serde(default)]
    pub fuzzy: bool,
}

impl Default for ProcedureMappingConfig {
    fn default() -> Self {
        Self { fuzzy: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub journal: JournalConfig,
    pub protocol_db_path: PathBuf,
    pub device_safety_limits: DeviceSafetyLimits,
    pub worklist: WorklistConfig,
    pub export: ExportConfig,
    #[serde(default)]
    pub procedure_mapping: ProcedureMappingConfig,
    #[serde(default = "default_interlock_timeout_ms")]
    pub interlock_query_timeout_ms: u64,
    #[serde(default = "default_trigger_latency_budget_ms")]
    pub exposure_trigger_latency_budget_ms: u64,
    #[serde(default = "default_mid_exposure_poll_ms")]
    pub mid_exposure_poll_ms: u64,
    #[serde(default = "default_recovery_deadline_ms")]
    pub crash_recovery_deadline_ms: u64,
    /// Log output format: `"pretty"` for development, `"json"` for aggregated
    /// production logging.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_worklist_retries() -> u32 {
    3
}
fn default_export_retries() -> u32 {
    5
}
fn default_interlock_timeout_ms() -> u64 {
    10
}
fn default_trigger_latency_budget_ms() -> u64 {
    200
}
fn default_mid_exposure_poll_ms() -> u64 {
    100
}
fn default_recovery_deadline_ms() -> u64 {
    5000
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            journal: JournalConfig {
                path: PathBuf::from("journal.ndjson"),
                retention: RetentionPolicy::Keep,
            },
            protocol_db_path: PathBuf::from("protocols.toml"),
            device_safety_limits: DeviceSafetyLimits::default(),
            worklist: WorklistConfig {
                max_retries: default_worklist_retries(),
            },
            export: ExportConfig {
                max_retries: default_export_retries(),
            },
            procedure_mapping: ProcedureMappingConfig::default(),
            interlock_query_timeout_ms: default_interlock_timeout_ms(),
            exposure_trigger_latency_budget_ms: default_trigger_latency_budget_ms(),
            mid_exposure_poll_ms: default_mid_exposure_poll_ms(),
            crash_recovery_deadline_ms: default_recovery_deadline_ms(),
            log_format: default_log_format(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `config.toml` (if present) layered with
    /// `ENGINE_`-prefixed environment variables, falling back to built-in defaults
    /// for anything unset.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        Figment::from(figment::providers::Serialized::defaults(
            EngineConfig::default(),
        ))
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed("ENGINE_").split("__"))
        .extract()
        .map_err(|e| EngineError::Configuration(e.to_string()))
    }

    pub fn mid_exposure_poll_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.mid_exposure_poll_ms)
    }

    pub fn interlock_query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interlock_query_timeout_ms)
    }

    pub fn crash_recovery_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.crash_recovery_deadline_ms)
    }

    pub fn exposure_trigger_latency_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.exposure_trigger_latency_budget_ms)
    }
}
