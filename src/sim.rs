//! Simulated driver: a stand-in for the vendor hardware so the pipeline can
//! run in demos and tests without a chassis attached.

use crate::driver::{
    DaqDriver, DaqTask, DriverError, ReadData, TemperatureUnit, ThermocoupleType,
};
use std::time::Duration;

const ERR_TASK_INVALID: i32 = -200088;
const ERR_TASK_NOT_STARTED: i32 = -200983;

/// Simulated chassis. Every created task produces deterministic waveforms,
/// so tests that read from it are repeatable.
#[derive(Debug, Clone)]
pub struct SimDevice {
    /// Samples reported available per channel on each poll.
    chunk: usize,
}

impl SimDevice {
    pub fn new() -> Self {
        Self { chunk: 4 }
    }

    pub fn with_chunk(chunk: usize) -> Self {
        Self { chunk }
    }
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DaqDriver for SimDevice {
    type Task = SimTask;

    fn create_task(&mut self, name: &str) -> Result<SimTask, DriverError> {
        Ok(SimTask {
            name: name.to_string(),
            channels: Vec::new(),
            rate_hz: 0.0,
            chunk: self.chunk,
            started: false,
            cleared: false,
            cursor: 0,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum SimChannel {
    Thermocouple,
    Voltage,
}

/// One simulated channel group.
#[derive(Debug)]
pub struct SimTask {
    name: String,
    channels: Vec<SimChannel>,
    rate_hz: f64,
    chunk: usize,
    started: bool,
    cleared: bool,
    cursor: u64,
}

impl SimTask {
    fn check_valid(&self) -> Result<(), DriverError> {
        if self.cleared {
            return Err(DriverError::new(
                ERR_TASK_INVALID,
                format!("task '{}' has been released", self.name),
            ));
        }
        Ok(())
    }

    fn sample(&self, channel: usize, step: u64) -> f64 {
        let t = step as f64 / self.rate_hz.max(1.0);
        match self.channels[channel] {
            // Slow drift around a plausible ambient temperature.
            SimChannel::Thermocouple => {
                22.0 + 1.5 * channel as f64 + 0.8 * (0.4 * t).sin()
            }
            SimChannel::Voltage => {
                0.5 + 0.25 * channel as f64 + 0.05 * (2.0 * t + channel as f64).sin()
            }
        }
    }
}

impl DaqTask for SimTask {
    fn add_thermocouple_channel(
        &mut self,
        _physical_channel: &str,
        _tc_type: ThermocoupleType,
        _units: TemperatureUnit,
    ) -> Result<(), DriverError> {
        self.check_valid()?;
        self.channels.push(SimChannel::Thermocouple);
        Ok(())
    }

    fn add_voltage_channel(&mut self, _physical_channel: &str) -> Result<(), DriverError> {
        self.check_valid()?;
        self.channels.push(SimChannel::Voltage);
        Ok(())
    }

    fn configure_continuous(
        &mut self,
        rate_hz: f64,
        _samples_per_channel: usize,
    ) -> Result<(), DriverError> {
        self.check_valid()?;
        self.rate_hz = rate_hz;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.check_valid()?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.check_valid()?;
        self.started = false;
        Ok(())
    }

    fn available_samples(&mut self) -> Result<usize, DriverError> {
        self.check_valid()?;
        if !self.started {
            return Ok(0);
        }
        Ok(self.chunk)
    }

    fn read(
        &mut self,
        samples_per_channel: usize,
        _timeout: Duration,
    ) -> Result<ReadData, DriverError> {
        self.check_valid()?;
        if !self.started {
            return Err(DriverError::new(
                ERR_TASK_NOT_STARTED,
                format!("task '{}' is not running", self.name),
            ));
        }

        let bursts = (0..self.channels.len())
            .map(|channel| {
                (0..samples_per_channel)
                    .map(|step| self.sample(channel, self.cursor + step as u64))
                    .collect()
            })
            .collect();
        self.cursor += samples_per_channel as u64;
        Ok(ReadData::Bursts(bursts))
    }

    fn clear(&mut self) -> Result<(), DriverError> {
        self.check_valid()?;
        self.started = false;
        self.cleared = true;
        Ok(())
    }
}
