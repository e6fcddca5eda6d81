//! CSV logging session: one timestamp-named file per session, one flushed
//! row per updated tick.

use crate::calibration::{AI_CHANNEL_COUNT, TC_CHANNEL_COUNT};
use chrono::{DateTime, Local};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// An open log file. Dropping the session closes it; rows are flushed as they
/// are written, so a drop on an error path loses nothing.
pub struct LogSession {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl LogSession {
    /// Create `log_<timestamp>.csv` in `dir` and write the header row.
    pub fn open(dir: &Path) -> Result<Self, LogError> {
        std::fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("log_{stamp}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec!["timestamp".to_string()];
        for i in 0..TC_CHANNEL_COUNT {
            header.push(format!("tc{i}_raw"));
        }
        for i in 0..TC_CHANNEL_COUNT {
            header.push(format!("tc{i}_cal"));
        }
        for i in 0..AI_CHANNEL_COUNT {
            header.push(format!("ai{i}_raw"));
        }
        for i in 0..AI_CHANNEL_COUNT {
            header.push(format!("ai{i}_cal"));
        }
        writer.write_record(&header)?;
        writer.flush()?;

        log::info!("logging to {}", path.display());
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, raw-then-calibrated per group, and flush it to disk.
    pub fn append(
        &mut self,
        timestamp: DateTime<Local>,
        tc_raw: &[Option<f64>],
        tc_cal: &[Option<f64>],
        ai_raw: &[Option<f64>],
        ai_cal: &[Option<f64>],
    ) -> Result<(), LogError> {
        let mut row = Vec::with_capacity(1 + 2 * (TC_CHANNEL_COUNT + AI_CHANNEL_COUNT));
        row.push(timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
        for group in [tc_raw, tc_cal, ai_raw, ai_cal] {
            row.extend(group.iter().map(field));
        }

        self.writer.write_record(&row)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and close the file.
    pub fn finish(mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn field(value: &Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_nan() => "NaN".to_string(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let session = LogSession::open(dir.path()).unwrap();
        let path = session.path().to_path_buf();
        session.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "timestamp,tc0_raw,tc1_raw,tc2_raw,tc0_cal,tc1_cal,tc2_cal,\
             ai0_raw,ai1_raw,ai2_raw,ai3_raw,ai0_cal,ai1_cal,ai2_cal,ai3_cal"
        );
    }

    #[test]
    fn test_append_encodes_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LogSession::open(dir.path()).unwrap();
        let path = session.path().to_path_buf();

        session
            .append(
                Local::now(),
                &[Some(21.5), None, Some(f64::NAN)],
                &[Some(21.5), None, Some(f64::NAN)],
                &[Some(0.5), Some(1.0), Some(1.5), Some(2.0)],
                &[Some(5.0), Some(10.0), Some(15.0), Some(20.0)],
            )
            .unwrap();
        session.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let row = text.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 15);
        assert_eq!(fields[1], "21.5");
        assert_eq!(fields[2], "");
        assert_eq!(fields[3], "NaN");
        assert_eq!(fields[7], "0.5");
    }

    #[test]
    fn test_rows_are_flushed_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LogSession::open(dir.path()).unwrap();

        session
            .append(
                Local::now(),
                &[Some(1.0), Some(2.0), Some(3.0)],
                &[Some(1.0), Some(2.0), Some(3.0)],
                &[Some(0.0); 4],
                &[Some(0.0); 4],
            )
            .unwrap();

        // Session is still open; the row must already be on disk.
        let text = std::fs::read_to_string(session.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_file_name_is_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let session = LogSession::open(dir.path()).unwrap();
        let name = session.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".csv"));
    }
}
