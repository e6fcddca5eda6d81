//! Acquisition controller: owns the two channel-group tasks, the state
//! machine and the periodic sample/calibrate/log/display tick.

use crate::calibration::{CalibrationTable, ChannelId, AI_CHANNEL_COUNT, TC_CHANNEL_COUNT};
use crate::display::{self, ChannelReadout, DisplaySink, PanelSnapshot};
use crate::driver::{DaqDriver, DaqTask, DriverError, TemperatureUnit, ThermocoupleType};
use crate::logging::{LogError, LogSession};
use crate::reader::{read_latest, BurstPolicy};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Update periods below this are clamped up; the driver needs headroom to
/// settle between thermocouple conversions.
pub const MIN_UPDATE_PERIOD: Duration = Duration::from_millis(50);

/// Lifecycle of the acquisition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Disconnected,
    Connected,
    Running,
    Stopped,
    /// A tick failed. The hardware connection is intact; `start()` retries
    /// without reconnecting.
    ErrorStopped,
}

impl AcquisitionState {
    /// Operator-facing status line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionState::Disconnected => "Disconnected",
            AcquisitionState::Connected => "Connected (tasks created)",
            AcquisitionState::Running => "Running",
            AcquisitionState::Stopped => "Connected (stopped)",
            AcquisitionState::ErrorStopped => "Error (stopped)",
        }
    }
}

/// External configuration for the panel core.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Module identifier of the thermocouple input module, as the vendor
    /// configuration tool shows it.
    pub tc_module: String,
    /// Module identifier of the analog voltage input module.
    pub ai_module: String,
    pub tc_type: ThermocoupleType,
    /// Requested UI update period; clamped to [`MIN_UPDATE_PERIOD`].
    pub update_period: Duration,
    pub logging_enabled: bool,
    pub log_dir: PathBuf,
    pub burst_policy: BurstPolicy,
}

impl PanelConfig {
    pub fn new(tc_module: impl Into<String>, ai_module: impl Into<String>) -> Self {
        Self {
            tc_module: tc_module.into(),
            ai_module: ai_module.into(),
            tc_type: ThermocoupleType::default(),
            update_period: Duration::from_millis(200),
            logging_enabled: false,
            log_dir: PathBuf::from("."),
            burst_policy: BurstPolicy::default(),
        }
    }

    pub fn effective_update_period(&self) -> Duration {
        self.update_period.max(MIN_UPDATE_PERIOD)
    }
}

/// Sampling rates derived from the update period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupRates {
    pub thermocouple_hz: f64,
    pub analog_hz: f64,
}

/// Derive per-group sample rates from the UI update period.
///
/// Thermocouples are sampled slowly (the converter settles between reads)
/// while analog inputs are oversampled so latest-value extraction has fresh
/// data every tick.
pub fn derive_rates(update_period: Duration) -> GroupRates {
    let period_ms = update_period.max(MIN_UPDATE_PERIOD).as_millis() as f64;
    let ui_hz = 1000.0 / period_ms;
    GroupRates {
        thermocouple_hz: (ui_hz * 2.0).clamp(1.0, 10.0),
        analog_hz: (ui_hz * 10.0).clamp(10.0, 1000.0),
    }
}

/// Buffer depth for roughly two seconds of samples at `rate_hz`.
fn buffer_depth(rate_hz: f64) -> usize {
    ((rate_hz * 2.0) as usize).max(2)
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("acquisition is not running")]
    NotRunning,

    #[error("module identifier for the {group} group is empty")]
    EmptyModuleId { group: &'static str },

    #[error("hardware driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Owns the two channel-group tasks, the latched raw values, the calibration
/// table and the optional log session. Exactly one logical actor drives it;
/// everything happens synchronously inside its methods.
pub struct AcquisitionController<D: DaqDriver> {
    driver: D,
    config: PanelConfig,
    calibration: CalibrationTable,
    state: AcquisitionState,
    tc_task: Option<D::Task>,
    ai_task: Option<D::Task>,
    tc_raw: Vec<Option<f64>>,
    ai_raw: Vec<Option<f64>>,
    log_session: Option<LogSession>,
}

impl<D: DaqDriver> AcquisitionController<D> {
    pub fn new(driver: D, config: PanelConfig, calibration: CalibrationTable) -> Self {
        Self {
            driver,
            config,
            calibration,
            state: AcquisitionState::Disconnected,
            tc_task: None,
            ai_task: None,
            tc_raw: vec![None; TC_CHANNEL_COUNT],
            ai_raw: vec![None; AI_CHANNEL_COUNT],
            log_session: None,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Mutable access to the configuration. Connection-affecting fields are
    /// read at `connect()`/`start()` time, so edits take effect on the next
    /// transition.
    pub fn config_mut(&mut self) -> &mut PanelConfig {
        &mut self.config
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// Install an edited calibration table. The acquisition loop itself never
    /// mutates calibration.
    pub fn set_calibration(&mut self, calibration: CalibrationTable) {
        self.calibration = calibration;
    }

    /// Path of the currently open log file, if a session is active.
    pub fn log_session_path(&self) -> Option<&Path> {
        self.log_session.as_ref().map(LogSession::path)
    }

    /// Create both channel-group tasks against the driver.
    ///
    /// Validates the module identifiers before touching hardware. Any
    /// construction failure releases whatever was created and leaves the
    /// controller `Disconnected`.
    pub fn connect(&mut self) -> Result<(), AcquisitionError> {
        if self.state != AcquisitionState::Disconnected {
            return Err(AcquisitionError::AlreadyConnected);
        }

        let tc_module = self.config.tc_module.trim().to_string();
        let ai_module = self.config.ai_module.trim().to_string();
        if tc_module.is_empty() {
            return Err(AcquisitionError::EmptyModuleId {
                group: "thermocouple",
            });
        }
        if ai_module.is_empty() {
            return Err(AcquisitionError::EmptyModuleId { group: "analog" });
        }

        let mut tc_task = self.driver.create_task("tc_inputs")?;
        if let Err(e) = Self::add_thermocouple_channels(&mut tc_task, &tc_module, self.config.tc_type)
        {
            Self::release_task(&mut tc_task, "thermocouple");
            return Err(e.into());
        }

        let mut ai_task = match self.driver.create_task("ai_inputs") {
            Ok(task) => task,
            Err(e) => {
                Self::release_task(&mut tc_task, "thermocouple");
                return Err(e.into());
            }
        };
        if let Err(e) = Self::add_voltage_channels(&mut ai_task, &ai_module) {
            Self::release_task(&mut tc_task, "thermocouple");
            Self::release_task(&mut ai_task, "analog");
            return Err(e.into());
        }

        self.tc_task = Some(tc_task);
        self.ai_task = Some(ai_task);
        self.state = AcquisitionState::Connected;
        log::info!("connected: tc module '{}', ai module '{}'", tc_module, ai_module);
        Ok(())
    }

    fn add_thermocouple_channels(
        task: &mut D::Task,
        module: &str,
        tc_type: ThermocoupleType,
    ) -> Result<(), DriverError> {
        for i in 0..TC_CHANNEL_COUNT {
            task.add_thermocouple_channel(
                &format!("{module}/ai{i}"),
                tc_type,
                TemperatureUnit::Celsius,
            )?;
        }
        Ok(())
    }

    fn add_voltage_channels(task: &mut D::Task, module: &str) -> Result<(), DriverError> {
        for i in 0..AI_CHANNEL_COUNT {
            task.add_voltage_channel(&format!("{module}/ai{i}"))?;
        }
        Ok(())
    }

    /// Configure timing on both groups and begin acquiring.
    ///
    /// Valid from `Connected`, `Stopped` and `ErrorStopped`; a repeated
    /// `start()` while running is a no-op. On failure the hardware stays
    /// allocated and the controller returns to `Connected`.
    pub fn start(&mut self) -> Result<(), AcquisitionError> {
        match self.state {
            AcquisitionState::Disconnected => return Err(AcquisitionError::NotConnected),
            AcquisitionState::Running => return Ok(()),
            AcquisitionState::Connected
            | AcquisitionState::Stopped
            | AcquisitionState::ErrorStopped => {}
        }

        let rates = derive_rates(self.config.update_period);
        let (Some(tc_task), Some(ai_task)) = (self.tc_task.as_mut(), self.ai_task.as_mut()) else {
            return Err(AcquisitionError::NotConnected);
        };

        let started = (|| -> Result<(), DriverError> {
            tc_task.configure_continuous(
                rates.thermocouple_hz,
                buffer_depth(rates.thermocouple_hz),
            )?;
            ai_task.configure_continuous(rates.analog_hz, buffer_depth(rates.analog_hz))?;
            tc_task.start()?;
            ai_task.start()?;
            Ok(())
        })();

        if let Err(e) = started {
            self.state = AcquisitionState::Connected;
            return Err(e.into());
        }

        self.state = AcquisitionState::Running;
        log::info!(
            "running at {:.1} Hz (tc) / {:.1} Hz (ai)",
            rates.thermocouple_hz,
            rates.analog_hz
        );

        if self.config.logging_enabled && self.log_session.is_none() {
            if let Err(e) = self.open_log_session() {
                log::error!("could not open log file, logging disabled: {}", e);
                self.config.logging_enabled = false;
            }
        }
        Ok(())
    }

    /// Halt both groups and close any open log session. Stop errors are
    /// swallowed: the channels stay allocated either way.
    pub fn stop(&mut self) {
        if self.state != AcquisitionState::Running {
            return;
        }
        self.halt_groups();
        self.close_log_session();
        self.state = AcquisitionState::Stopped;
        log::info!("acquisition stopped");
    }

    /// Release both channel groups and return to a clean baseline. Reachable
    /// from every state; release failures are swallowed.
    pub fn disconnect(&mut self) {
        if self.state == AcquisitionState::Disconnected {
            return;
        }
        self.stop();
        self.close_log_session();

        if let Some(mut task) = self.tc_task.take() {
            Self::release_task(&mut task, "thermocouple");
        }
        if let Some(mut task) = self.ai_task.take() {
            Self::release_task(&mut task, "analog");
        }

        self.tc_raw = vec![None; TC_CHANNEL_COUNT];
        self.ai_raw = vec![None; AI_CHANNEL_COUNT];
        self.state = AcquisitionState::Disconnected;
        log::info!("disconnected");
    }

    /// Toggle logging. While running, enabling opens a session immediately
    /// and disabling closes the open one. An open failure disables logging
    /// again and is returned to the caller; acquisition keeps going.
    pub fn set_logging_enabled(&mut self, enabled: bool) -> Result<(), LogError> {
        self.config.logging_enabled = enabled;
        if self.state != AcquisitionState::Running {
            return Ok(());
        }
        if enabled {
            if self.log_session.is_none() {
                if let Err(e) = self.open_log_session() {
                    self.config.logging_enabled = false;
                    return Err(e);
                }
            }
        } else {
            self.close_log_session();
        }
        Ok(())
    }

    /// One sample→calibrate→log cycle.
    ///
    /// On a hard driver failure the controller stops the groups best-effort,
    /// closes the log session and moves to `ErrorStopped`, keeping the
    /// connection so the operator can `start()` again.
    pub fn tick(&mut self) -> Result<PanelSnapshot, AcquisitionError> {
        if self.state != AcquisitionState::Running {
            return Err(AcquisitionError::NotRunning);
        }
        match self.sample_once() {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                log::error!("tick failed, stopping acquisition: {}", e);
                self.halt_groups();
                self.close_log_session();
                self.state = AcquisitionState::ErrorStopped;
                Err(e)
            }
        }
    }

    fn sample_once(&mut self) -> Result<PanelSnapshot, AcquisitionError> {
        let policy = self.config.burst_policy;

        let tc_task = self.tc_task.as_mut().ok_or(AcquisitionError::NotConnected)?;
        let tc_values = read_latest(tc_task, TC_CHANNEL_COUNT, policy)?;
        let ai_task = self.ai_task.as_mut().ok_or(AcquisitionError::NotConnected)?;
        let ai_values = read_latest(ai_task, AI_CHANNEL_COUNT, policy)?;

        let mut updated = false;
        if let Some(values) = tc_values {
            for (slot, value) in self.tc_raw.iter_mut().zip(values) {
                *slot = Some(value);
            }
            updated = true;
        }
        if let Some(values) = ai_values {
            for (slot, value) in self.ai_raw.iter_mut().zip(values) {
                *slot = Some(value);
            }
            updated = true;
        }

        let snapshot = self.snapshot();

        // Rows are only written for ticks that actually produced data.
        let mut log_failed = false;
        if updated {
            if let Some(session) = self.log_session.as_mut() {
                let tc_cal: Vec<Option<f64>> =
                    snapshot.thermocouples.iter().map(|r| r.calibrated).collect();
                let ai_cal: Vec<Option<f64>> =
                    snapshot.analog_inputs.iter().map(|r| r.calibrated).collect();
                if let Err(e) =
                    session.append(Local::now(), &self.tc_raw, &tc_cal, &self.ai_raw, &ai_cal)
                {
                    log::error!("log write failed, logging disabled: {}", e);
                    log_failed = true;
                }
            }
        }
        if log_failed {
            self.config.logging_enabled = false;
            self.close_log_session();
        }

        Ok(snapshot)
    }

    /// The latest latched values, calibrated and formatted.
    pub fn snapshot(&self) -> PanelSnapshot {
        let thermocouples = (0..TC_CHANNEL_COUNT)
            .map(|i| {
                let id = ChannelId::thermocouple(i as u8);
                let raw = self.tc_raw[i];
                let calibrated = self.calibration.apply(id, raw);
                ChannelReadout {
                    id,
                    raw,
                    calibrated,
                    text: display::format_temperature(calibrated),
                }
            })
            .collect();
        let analog_inputs = (0..AI_CHANNEL_COUNT)
            .map(|i| {
                let id = ChannelId::analog(i as u8);
                let raw = self.ai_raw[i];
                let calibrated = self.calibration.apply(id, raw);
                ChannelReadout {
                    id,
                    raw,
                    calibrated,
                    text: display::format_voltage(calibrated),
                }
            })
            .collect();

        PanelSnapshot {
            state: self.state,
            thermocouples,
            analog_inputs,
        }
    }

    fn open_log_session(&mut self) -> Result<(), LogError> {
        let session = LogSession::open(&self.config.log_dir)?;
        self.log_session = Some(session);
        Ok(())
    }

    fn close_log_session(&mut self) {
        if let Some(session) = self.log_session.take() {
            if let Err(e) = session.finish() {
                log::warn!("error while closing log file: {}", e);
            }
        }
    }

    fn halt_groups(&mut self) {
        if let Some(task) = self.tc_task.as_mut() {
            if let Err(e) = task.stop() {
                log::warn!("thermocouple group stop failed: {}", e);
            }
        }
        if let Some(task) = self.ai_task.as_mut() {
            if let Err(e) = task.stop() {
                log::warn!("analog group stop failed: {}", e);
            }
        }
    }

    fn release_task(task: &mut D::Task, group: &str) {
        if let Err(e) = task.clear() {
            log::warn!("failed to release {} task: {}", group, e);
        }
    }
}

/// Drive the periodic tick on the calling thread until acquisition leaves
/// `Running` or `keep_going` declines the latest snapshot.
///
/// Ticks are strictly sequential; the next one is armed only after the
/// current one (including its log write) completes, so the effective period
/// drifts by the read latency but ticks never overlap. Stopping the
/// controller cancels the pending tick because the state is re-checked before
/// each arm.
pub fn run_ticks<D, S, F>(
    controller: &mut AcquisitionController<D>,
    sink: &mut S,
    mut keep_going: F,
) -> Result<(), AcquisitionError>
where
    D: DaqDriver,
    S: DisplaySink,
    F: FnMut(&PanelSnapshot) -> bool,
{
    while controller.state() == AcquisitionState::Running {
        let snapshot = controller.tick()?;
        sink.update(&snapshot);
        if !keep_going(&snapshot) {
            break;
        }
        std::thread::sleep(controller.config().effective_update_period());
    }
    Ok(())
}
