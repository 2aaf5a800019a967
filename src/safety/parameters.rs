//! Exposure parameter validation against device safety limits.

use crate::model::protocol::{DeviceSafetyLimits, Protocol};

/// Outcome of validating a protocol's exposure parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValidation {
    pub violations: Vec<String>,
    /// Set when `mas` exceeds `dap_warning_level` — a soft warning that does not
    /// block acceptance.
    pub dap_warning: Option<String>,
}

impl ParameterValidation {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validates `protocol`'s exposure parameters against `limits`. Called before any
/// protocol or exposure is accepted.
pub fn validate(protocol: &Protocol, limits: &DeviceSafetyLimits) -> ParameterValidation {
    let mut violations = Vec::new();

    if protocol.kvp < limits.min_kvp || protocol.kvp > limits.max_kvp {
        violations.push(format!(
            "kvp {} outside [{}, {}]",
            protocol.kvp, limits.min_kvp, limits.max_kvp
        ));
    }
    if protocol.ma < limits.min_ma || protocol.ma > limits.max_ma {
        violations.push(format!(
            "ma {} outside [{}, {}]",
            protocol.ma, limits.min_ma, limits.max_ma
        ));
    }
    if protocol.exposure_time_ms > limits.max_exposure_time_ms {
        violations.push(format!(
            "exposure_time_ms {} exceeds max {}",
            protocol.exposure_time_ms, limits.max_exposure_time_ms
        ));
    }

    let mas = protocol.mas();
    if mas > limits.max_mas {
        violations.push(format!("mas {mas} exceeds max {}", limits.max_mas));
    }

    let dap_warning = if mas > limits.dap_warning_level {
        Some(format!(
            "mas {mas} exceeds dap_warning_level {}",
            limits.dap_warning_level
        ))
    } else {
        None
    };

    ParameterValidation {
        violations,
        dap_warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> DeviceSafetyLimits {
        DeviceSafetyLimits {
            min_kvp: 40.0,
            max_kvp: 150.0,
            min_ma: 1.0,
            max_ma: 800.0,
            max_exposure_time_ms: 4000.0,
            max_mas: 400.0,
            dap_warning_level: 50.0,
        }
    }

    #[test]
    fn nominal_protocol_passes() {
        let mut p = Protocol::new("P1", "CHEST", "PA", "DeviceX");
        p.kvp = 120.0;
        p.ma = 100.0;
        p.exposure_time_ms = 100.0;
        let result = validate(&p, &limits());
        assert!(result.is_valid());
        assert!(result.dap_warning.is_none());
    }

    #[test]
    fn scenario_3_kvp_200_exceeds_max_150() {
        let mut p = Protocol::new("P1", "CHEST", "PA", "DeviceX");
        p.kvp = 200.0;
        p.ma = 100.0;
        p.exposure_time_ms = 100.0;
        let result = validate(&p, &limits());
        assert!(!result.is_valid());
    }

    #[test]
    fn dap_warning_does_not_block() {
        let mut p = Protocol::new("P1", "CHEST", "PA", "DeviceX");
        p.kvp = 150.0;
        p.ma = 400.0;
        p.exposure_time_ms = 10.0;
        let result = validate(&p, &limits());
        assert!(result.is_valid());
        assert!(result.dap_warning.is_some());
    }
}
