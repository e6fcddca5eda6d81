use std::time::Duration;

/// Vendor status code for "no samples currently available yet".
///
/// During polling this is a benign condition, not a fault: the reader maps it
/// to "no new data this tick" and the caller keeps its latched values.
pub const NO_DATA_YET_CODE: i32 = -200284;

/// Thermocouple sensor types accepted by the temperature input module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermocoupleType {
    J,
    K,
    T,
    E,
    N,
    R,
    S,
    B,
}

impl ThermocoupleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThermocoupleType::J => "J",
            ThermocoupleType::K => "K",
            ThermocoupleType::T => "T",
            ThermocoupleType::E => "E",
            ThermocoupleType::N => "N",
            ThermocoupleType::R => "R",
            ThermocoupleType::S => "S",
            ThermocoupleType::B => "B",
        }
    }
}

impl Default for ThermocoupleType {
    fn default() -> Self {
        ThermocoupleType::K
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown thermocouple type '{0}'")]
pub struct UnknownThermocoupleType(String);

impl std::str::FromStr for ThermocoupleType {
    type Err = UnknownThermocoupleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "J" => Ok(ThermocoupleType::J),
            "K" => Ok(ThermocoupleType::K),
            "T" => Ok(ThermocoupleType::T),
            "E" => Ok(ThermocoupleType::E),
            "N" => Ok(ThermocoupleType::N),
            "R" => Ok(ThermocoupleType::R),
            "S" => Ok(ThermocoupleType::S),
            "B" => Ok(ThermocoupleType::B),
            _ => Err(UnknownThermocoupleType(s.to_string())),
        }
    }
}

/// Engineering unit for thermocouple channels. The panel always requests
/// Celsius; the other units exist because the module supports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "degC",
            TemperatureUnit::Fahrenheit => "degF",
            TemperatureUnit::Kelvin => "K",
        }
    }
}

/// Shapes a buffered read may come back in, depending on channel count and
/// how many samples per channel were requested.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadData {
    /// Single channel, single sample.
    Scalar(f64),
    /// One scalar per channel.
    Flat(Vec<f64>),
    /// One burst of samples per channel.
    Bursts(Vec<Vec<f64>>),
}

/// Error reported by the vendor driver, carrying the vendor status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("DAQ driver error {code}: {message}")]
pub struct DriverError {
    pub code: i32,
    pub message: String,
}

impl DriverError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_data_yet() -> Self {
        Self::new(NO_DATA_YET_CODE, "no samples are currently available")
    }

    pub fn is_no_data_yet(&self) -> bool {
        self.code == NO_DATA_YET_CODE
    }
}

/// One hardware input task: a group of channels sampled with shared timing.
///
/// Mirrors the slice of the vendor task API the panel consumes. Channels are
/// added while the task is idle, timing is configured per run, and reads are
/// non-blocking polls against the task's sample buffer.
pub trait DaqTask {
    fn add_thermocouple_channel(
        &mut self,
        physical_channel: &str,
        tc_type: ThermocoupleType,
        units: TemperatureUnit,
    ) -> Result<(), DriverError>;

    fn add_voltage_channel(&mut self, physical_channel: &str) -> Result<(), DriverError>;

    /// Configure buffered continuous acquisition at `rate_hz` with a buffer of
    /// `samples_per_channel` samples per channel.
    fn configure_continuous(
        &mut self,
        rate_hz: f64,
        samples_per_channel: usize,
    ) -> Result<(), DriverError>;

    fn start(&mut self) -> Result<(), DriverError>;

    fn stop(&mut self) -> Result<(), DriverError>;

    /// Number of buffered samples currently available per channel.
    fn available_samples(&mut self) -> Result<usize, DriverError>;

    /// Read up to `samples_per_channel` samples per channel, waiting at most
    /// `timeout` for them to arrive.
    fn read(
        &mut self,
        samples_per_channel: usize,
        timeout: Duration,
    ) -> Result<ReadData, DriverError>;

    /// Release the task's hardware resources. The task is unusable afterwards.
    fn clear(&mut self) -> Result<(), DriverError>;
}

/// Factory half of the driver boundary.
pub trait DaqDriver {
    type Task: DaqTask;

    fn create_task(&mut self, name: &str) -> Result<Self::Task, DriverError>;
}
