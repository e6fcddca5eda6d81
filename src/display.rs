//! Formatted readouts handed to whatever renders the panel.

use crate::acquisition::AcquisitionState;
use crate::calibration::ChannelId;

/// Shown in place of a value that is unset or invalid.
pub const PLACEHOLDER: &str = "—";

/// Format a calibrated temperature with 2 decimal places.
pub fn format_temperature(value: Option<f64>) -> String {
    format_fixed(value, 2)
}

/// Format a calibrated voltage with 4 decimal places.
pub fn format_voltage(value: Option<f64>) -> String {
    format_fixed(value, 4)
}

fn format_fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.decimals$}"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// One channel's current readout.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReadout {
    pub id: ChannelId,
    pub raw: Option<f64>,
    pub calibrated: Option<f64>,
    /// `calibrated` rendered at the channel kind's fixed precision.
    pub text: String,
}

/// Everything the panel shows after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSnapshot {
    pub state: AcquisitionState,
    pub thermocouples: Vec<ChannelReadout>,
    pub analog_inputs: Vec<ChannelReadout>,
}

impl PanelSnapshot {
    /// All readouts, thermocouples first.
    pub fn readouts(&self) -> impl Iterator<Item = &ChannelReadout> {
        self.thermocouples.iter().chain(self.analog_inputs.iter())
    }
}

/// Boundary to the rendering layer. The tick runner pushes a fresh snapshot
/// here after every tick.
pub trait DisplaySink {
    fn update(&mut self, snapshot: &PanelSnapshot);
}

/// Sink for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn update(&mut self, _snapshot: &PanelSnapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_precision() {
        assert_eq!(format_temperature(Some(23.456_789)), "23.46");
        assert_eq!(format_temperature(Some(-0.004)), "-0.00");
    }

    #[test]
    fn test_voltage_precision() {
        assert_eq!(format_voltage(Some(1.234_567_8)), "1.2346");
        assert_eq!(format_voltage(Some(5.0)), "5.0000");
    }

    #[test]
    fn test_placeholder_for_unset_and_invalid() {
        assert_eq!(format_temperature(None), PLACEHOLDER);
        assert_eq!(format_temperature(Some(f64::NAN)), PLACEHOLDER);
        assert_eq!(format_voltage(None), PLACEHOLDER);
        assert_eq!(format_voltage(Some(f64::NAN)), PLACEHOLDER);
    }
}
