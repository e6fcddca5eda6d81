//! # cdaq-panel
//!
//! Acquisition, calibration and logging core for a cDAQ live-readout panel:
//! 3 thermocouple channels and 4 analog voltage channels, sampled on a
//! periodic tick, mapped to engineering units through per-channel two-point
//! calibration, and optionally appended to a timestamped CSV log.
//!
//! The crate contains no rendering and no vendor bindings. The hardware is
//! consumed through the [`DaqDriver`]/[`DaqTask`] traits (a simulated
//! implementation ships in [`sim`]), and the panel UI is fed through the
//! [`DisplaySink`] boundary with pre-formatted strings.
//!
//! ## Features
//!
//! - **State machine**: connect → start → stop → disconnect, with error
//!   containment that keeps the connection alive after a failed tick
//! - **Latest-sample extraction**: tolerant of irregular driver buffering;
//!   channels latch their previous value when a tick brings no new data
//! - **Two-point calibration**: per-channel linear maps persisted to a small
//!   YAML file, safe on un-calibrated (degenerate) entries
//! - **CSV logging**: one timestamped file per session, one flushed row per
//!   updated tick
//!
//! ## Examples
//!
//! ### Running the pipeline against the simulated chassis
//!
//! ```rust,no_run
//! use cdaq_panel::{
//!     AcquisitionController, CalibrationTable, PanelConfig, SimDevice,
//! };
//!
//! let config = PanelConfig::new("SimChassisMod4", "SimChassisMod3");
//! let mut panel =
//!     AcquisitionController::new(SimDevice::new(), config, CalibrationTable::default());
//!
//! panel.connect()?;
//! panel.start()?;
//!
//! let snapshot = panel.tick()?;
//! for readout in snapshot.readouts() {
//!     println!("{}: {}", readout.id, readout.text);
//! }
//!
//! panel.stop();
//! panel.disconnect();
//! # Ok::<(), cdaq_panel::AcquisitionError>(())
//! ```
//!
//! ### Editing and persisting calibration
//!
//! ```rust,no_run
//! use cdaq_panel::{CalibrationEntry, CalibrationTable, ChannelId};
//! use std::path::Path;
//!
//! let path = Path::new("calibration.yaml");
//! let mut table = CalibrationTable::load(path);
//!
//! // Map 0..5 V on AI0 to 0..100 psi.
//! table.set_entry(
//!     ChannelId::analog(0),
//!     CalibrationEntry::new(0.0, 0.0, 5.0, 100.0),
//! )?;
//! table.save(path)?;
//! # Ok::<(), cdaq_panel::CalibrationError>(())
//! ```
//!
//! ### Driving the periodic tick
//!
//! ```rust,no_run
//! use cdaq_panel::{
//!     run_ticks, AcquisitionController, CalibrationTable, DisplaySink,
//!     PanelConfig, PanelSnapshot, SimDevice,
//! };
//!
//! struct Console;
//!
//! impl DisplaySink for Console {
//!     fn update(&mut self, snapshot: &PanelSnapshot) {
//!         let line: Vec<String> = snapshot
//!             .readouts()
//!             .map(|r| format!("{}={}", r.id, r.text))
//!             .collect();
//!         println!("[{}] {}", snapshot.state.as_str(), line.join("  "));
//!     }
//! }
//!
//! let config = PanelConfig::new("SimChassisMod4", "SimChassisMod3");
//! let mut panel =
//!     AcquisitionController::new(SimDevice::new(), config, CalibrationTable::default());
//! panel.connect()?;
//! panel.start()?;
//!
//! let mut remaining = 25usize;
//! run_ticks(&mut panel, &mut Console, |_snapshot| {
//!     remaining -= 1;
//!     remaining > 0
//! })?;
//!
//! panel.disconnect();
//! # Ok::<(), cdaq_panel::AcquisitionError>(())
//! ```

pub mod acquisition;
pub mod calibration;
pub mod display;
pub mod driver;
pub mod logging;
pub mod reader;
pub mod sim;

// Re-export the main types for convenience
pub use acquisition::{
    derive_rates, run_ticks, AcquisitionController, AcquisitionError, AcquisitionState,
    GroupRates, PanelConfig, MIN_UPDATE_PERIOD,
};

pub use calibration::{
    CalibrationEntry, CalibrationError, CalibrationTable, ChannelId, ChannelKind,
    AI_CHANNEL_COUNT, CHANNEL_COUNT, TC_CHANNEL_COUNT,
};

pub use display::{
    format_temperature, format_voltage, ChannelReadout, DisplaySink, NullDisplay, PanelSnapshot,
    PLACEHOLDER,
};

pub use driver::{
    DaqDriver, DaqTask, DriverError, ReadData, TemperatureUnit, ThermocoupleType,
    NO_DATA_YET_CODE,
};

pub use logging::{LogError, LogSession};

pub use reader::{normalize, read_latest, BurstPolicy, READ_CAP};

pub use sim::{SimDevice, SimTask};
