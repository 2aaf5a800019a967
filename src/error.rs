//! Centralized error taxonomy for the engine.
//!
//! `EngineError` consolidates every error kind the engine can raise (interlock
//! failure, parameter rejection, journal failure, external dependency failure, ...)
//! into a single `thiserror`-derived enum.

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no transition defined for ({from}, {trigger})")]
    InvalidTransition { from: String, trigger: String },

    #[error("guard(s) failed: {0:?}")]
    GuardFailed(Vec<String>),

    #[error("interlock(s) failed: {0:?}")]
    InterlockFailed(Vec<&'static str>),

    #[error("interlock query exceeded {0}ms and is treated as failed")]
    InterlockTimeout(u64),

    #[error("exposure parameter rejected: {0}")]
    ParameterRejected(String),

    #[error("hardware error: {0}")]
    HardwareError(String),

    #[error("hardware command timed out after {0}ms")]
    HardwareTimeout(u64),

    #[error("journal write failed: {0}")]
    JournalError(String),

    #[error("external dependency failed (non-blocking): {0}")]
    ExternalDependencyError(String),

    #[error("operation cancelled by operator")]
    CancelledByOperator,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether this error, if it occurred on a safety-critical path (interlock
    /// check, parameter validation, exposure command issue), must force-promote the
    /// in-flight transition to the unconditional `CriticalHardwareError` transition.
    pub fn is_critical_hardware(&self) -> bool {
        matches!(
            self,
            EngineError::HardwareError(_)
                | EngineError::HardwareTimeout(_)
                | EngineError::InterlockTimeout(_)
        )
    }
}
