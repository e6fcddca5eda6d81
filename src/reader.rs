//! Latest-sample extraction: reduce whatever the driver buffered since the
//! last tick to exactly one scalar per channel.

use crate::driver::{DaqTask, DriverError, ReadData};
use std::time::Duration;

/// Upper bound on samples read per channel per tick, so a stalled UI cannot
/// turn into an unbounded read.
pub const READ_CAP: usize = 200;

/// Which sample of a per-channel burst counts as the latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BurstPolicy {
    /// The temporally newest sample of each burst.
    #[default]
    MostRecent,
    /// The oldest sample of each burst.
    FirstOfBurst,
}

impl BurstPolicy {
    fn pick(&self, burst: &[f64]) -> f64 {
        let picked = match self {
            BurstPolicy::MostRecent => burst.last(),
            BurstPolicy::FirstOfBurst => burst.first(),
        };
        picked.copied().unwrap_or(f64::NAN)
    }
}

/// Poll `task` for the most recent value of each of its `expected_channels`
/// channels.
///
/// `Ok(None)` means "no new data this tick": the buffer is empty, the
/// availability query failed, or the driver raised its benign no-data code.
/// The caller keeps its previously latched values in that case. Any other
/// driver error is a hard failure.
pub fn read_latest<T: DaqTask>(
    task: &mut T,
    expected_channels: usize,
    policy: BurstPolicy,
) -> Result<Option<Vec<f64>>, DriverError> {
    let available = match task.available_samples() {
        Ok(n) => n,
        Err(e) => {
            log::debug!("available-sample query failed, skipping update: {}", e);
            return Ok(None);
        }
    };
    if available == 0 {
        return Ok(None);
    }

    let samples_to_read = available.min(READ_CAP);
    let data = match task.read(samples_to_read, Duration::ZERO) {
        Ok(data) => data,
        Err(e) if e.is_no_data_yet() => return Ok(None),
        Err(e) => return Err(e),
    };

    Ok(Some(normalize(data, expected_channels, policy)))
}

/// Normalize a driver read to exactly one scalar per channel: bursts collapse
/// to the sample selected by `policy`, short results pad with NaN, long
/// results truncate.
pub fn normalize(data: ReadData, expected_channels: usize, policy: BurstPolicy) -> Vec<f64> {
    let mut flat = match data {
        ReadData::Scalar(value) => vec![value],
        ReadData::Flat(values) => values,
        ReadData::Bursts(bursts) => bursts.iter().map(|burst| policy.pick(burst)).collect(),
    };
    flat.resize(expected_channels, f64::NAN);
    flat
}
