//! The nine-signal interlock snapshot.

use serde::{Deserialize, Serialize};

/// Atomic snapshot of all nine interlock signals, as returned by a single call to
/// [`crate::ports::safety_port::SafetyPort::check_all_interlocks`] so that no signal
/// is read at a different instant than the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterlockStatus {
    /// IL-01: room door closed.
    pub door_closed: bool,
    /// IL-02: emergency stop not activated.
    pub estop_clear: bool,
    /// IL-03: thermal status normal.
    pub thermal_normal: bool,
    /// IL-04: generator ready, no fault.
    pub generator_ready: bool,
    /// IL-05: detector ready.
    pub detector_ready: bool,
    /// IL-06: collimator in range.
    pub collimator_in_range: bool,
    /// IL-07: table locked.
    pub table_locked: bool,
    /// IL-08: cumulative dose within limits.
    pub dose_within_limits: bool,
    /// IL-09: AEC configured.
    pub aec_configured: bool,
}

impl InterlockStatus {
    /// All nine signals satisfied — the precondition for issuing any exposure
    /// command.
    pub fn all_ok(&self) -> bool {
        self.door_closed
            && self.estop_clear
            && self.thermal_normal
            && self.generator_ready
            && self.detector_ready
            && self.collimator_in_range
            && self.table_locked
            && self.dose_within_limits
            && self.aec_configured
    }

    /// IDs (`IL-01`..`IL-09`) of signals that do not meet their required value, for
    /// operator surfacing and journaling.
    pub fn offending_ids(&self) -> Vec<&'static str> {
        let checks: [(bool, &'static str); 9] = [
            (self.door_closed, "IL-01"),
            (self.estop_clear, "IL-02"),
            (self.thermal_normal, "IL-03"),
            (self.generator_ready, "IL-04"),
            (self.detector_ready, "IL-05"),
            (self.collimator_in_range, "IL-06"),
            (self.table_locked, "IL-07"),
            (self.dose_within_limits, "IL-08"),
            (self.aec_configured, "IL-09"),
        ];
        checks
            .into_iter()
            .filter(|(ok, _)| !ok)
            .map(|(_, id)| id)
            .collect()
    }

    /// All nine signals failed — the conservative, fail-closed snapshot used when an
    /// interlock query does not return within its timeout.
    pub fn all_failed() -> Self {
        Self {
            door_closed: false,
            estop_clear: false,
            thermal_normal: false,
            generator_ready: false,
            detector_ready: false,
            collimator_in_range: false,
            table_locked: false,
            dose_within_limits: false,
            aec_configured: false,
        }
    }

    /// All nine signals in their required state — the nominal, fully-safe snapshot.
    pub fn all_clear() -> Self {
        Self {
            door_closed: true,
            estop_clear: true,
            thermal_normal: true,
            generator_ready: true,
            detector_ready: true,
            collimator_in_range: true,
            table_locked: true,
            dose_within_limits: true,
            aec_configured: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_clear_passes() {
        assert!(InterlockStatus::all_clear().all_ok());
        assert!(InterlockStatus::all_clear().offending_ids().is_empty());
    }

    #[test]
    fn offending_ids_lists_door_and_estop() {
        let mut s = InterlockStatus::all_clear();
        s.door_closed = false;
        s.estop_clear = false;
        assert!(!s.all_ok());
        assert_eq!(s.offending_ids(), vec!["IL-01", "IL-02"]);
    }
}
