//! Exposure protocols and the device-wide safety limits they are validated against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AecMode {
    Disabled,
    Enabled,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusSize {
    Small,
    Large,
}

/// A named combination of exposure parameters for a body part / projection / device.
///
/// Composite identity is `(body_part, projection, device_model)`. Once
/// captured into an [`crate::model::study::ExposureRecord`] as a `protocol_snapshot`,
/// a `Protocol` is never mutated; the snapshot is the record of what was actually used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub protocol_id: String,
    pub body_part: String,
    pub projection: String,
    pub kvp: f64,
    pub ma: f64,
    pub exposure_time_ms: f64,
    pub aec_mode: AecMode,
    pub aec_chambers: u8,
    pub focus_size: FocusSize,
    pub grid_used: bool,
    pub device_model: String,
    pub procedure_codes: Vec<String>,
    pub is_active: bool,
}

impl Protocol {
    /// Minimal constructor for tests and the demo binary; fills in clinically
    /// reasonable defaults for everything not supplied.
    pub fn new(
        protocol_id: impl Into<String>,
        body_part: impl Into<String>,
        projection: impl Into<String>,
        device_model: impl Into<String>,
    ) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            body_part: body_part.into(),
            projection: projection.into(),
            kvp: 0.0,
            ma: 0.0,
            exposure_time_ms: 0.0,
            aec_mode: AecMode::Disabled,
            aec_chambers: 0,
            focus_size: FocusSize::Small,
            grid_used: false,
            device_model: device_model.into(),
            procedure_codes: Vec::new(),
            is_active: true,
        }
    }

    /// Composite identity key for repository lookup.
    pub fn key(&self) -> (String, String, String) {
        (
            self.body_part.clone(),
            self.projection.clone(),
            self.device_model.clone(),
        )
    }

    /// `mas = kvp × ma × exposure_time_ms / 1000`.
    pub fn mas(&self) -> f64 {
        self.kvp * self.ma * self.exposure_time_ms / 1000.0
    }
}

/// Process-wide, read-only-in-the-safety-path exposure limits for a device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeviceSafetyLimits {
    pub min_kvp: f64,
    pub max_kvp: f64,
    pub min_ma: f64,
    pub max_ma: f64,
    pub max_exposure_time_ms: f64,
    pub max_mas: f64,
    pub dap_warning_level: f64,
}

impl Default for DeviceSafetyLimits {
    fn default() -> Self {
        Self {
            min_kvp: 40.0,
            max_kvp: 150.0,
            min_ma: 1.0,
            max_ma: 800.0,
            max_exposure_time_ms: 4000.0,
            max_mas: 400.0,
            dap_warning_level: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mas_formula_matches_spec() {
        let mut p = Protocol::new("P1", "CHEST", "PA", "DeviceX");
        p.kvp = 120.0;
        p.ma = 100.0;
        p.exposure_time_ms = 100.0;
        assert!((p.mas() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn composite_key_ignores_protocol_id() {
        let a = Protocol::new("A", "CHEST", "PA", "DeviceX");
        let b = Protocol::new("B", "CHEST", "PA", "DeviceX");
        assert_eq!(a.key(), b.key());
    }
}
