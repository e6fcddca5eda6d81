//! Per-channel two-point linear calibration, persisted as a small YAML file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Number of thermocouple channels on the temperature input module.
pub const TC_CHANNEL_COUNT: usize = 3;
/// Number of voltage channels read from the analog input module.
pub const AI_CHANNEL_COUNT: usize = 4;
/// Total channels across both groups.
pub const CHANNEL_COUNT: usize = TC_CHANNEL_COUNT + AI_CHANNEL_COUNT;

/// The two hardware input groups.
///
/// Ordering matters: thermocouples sort before analog inputs so that ordered
/// iteration (and the saved calibration file) lists `TC0..TC2` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelKind {
    Thermocouple,
    AnalogVoltage,
}

/// Stable identity of one input channel, e.g. `TC1` or `AI3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId {
    pub kind: ChannelKind,
    pub index: u8,
}

impl ChannelId {
    pub const fn thermocouple(index: u8) -> Self {
        Self {
            kind: ChannelKind::Thermocouple,
            index,
        }
    }

    pub const fn analog(index: u8) -> Self {
        Self {
            kind: ChannelKind::AnalogVoltage,
            index,
        }
    }

    /// Every channel the panel knows about, thermocouples first.
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [
        Self::thermocouple(0),
        Self::thermocouple(1),
        Self::thermocouple(2),
        Self::analog(0),
        Self::analog(1),
        Self::analog(2),
        Self::analog(3),
    ];
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChannelKind::Thermocouple => write!(f, "TC{}", self.index),
            ChannelKind::AnalogVoltage => write!(f, "AI{}", self.index),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown channel identifier '{0}'")]
pub struct UnknownChannelId(String);

impl FromStr for ChannelId {
    type Err = UnknownChannelId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (kind, digits) = if let Some(rest) = trimmed.strip_prefix("TC") {
            (ChannelKind::Thermocouple, rest)
        } else if let Some(rest) = trimmed.strip_prefix("AI") {
            (ChannelKind::AnalogVoltage, rest)
        } else {
            return Err(UnknownChannelId(s.to_string()));
        };

        let index: u8 = digits
            .parse()
            .map_err(|_| UnknownChannelId(s.to_string()))?;
        let group_size = match kind {
            ChannelKind::Thermocouple => TC_CHANNEL_COUNT,
            ChannelKind::AnalogVoltage => AI_CHANNEL_COUNT,
        };
        if (index as usize) >= group_size {
            return Err(UnknownChannelId(s.to_string()));
        }

        Ok(ChannelId { kind, index })
    }
}

fn default_reference() -> f64 {
    1.0
}

/// Two-point linear map from raw driver units to engineering units.
///
/// The default entry maps through the degenerate pair `(0, 0) .. (1, 1)`,
/// which behaves as identity until the user calibrates the channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    #[serde(default)]
    pub raw1: f64,
    #[serde(default)]
    pub eng1: f64,
    #[serde(default = "default_reference")]
    pub raw2: f64,
    #[serde(default = "default_reference")]
    pub eng2: f64,
}

impl Default for CalibrationEntry {
    fn default() -> Self {
        Self {
            raw1: 0.0,
            eng1: 0.0,
            raw2: 1.0,
            eng2: 1.0,
        }
    }
}

impl CalibrationEntry {
    pub fn new(raw1: f64, eng1: f64, raw2: f64, eng2: f64) -> Self {
        Self {
            raw1,
            eng1,
            raw2,
            eng2,
        }
    }

    /// Map a raw reading to engineering units.
    ///
    /// Unset (`None`) and invalid (`NaN`) readings propagate untouched. An
    /// entry whose raw reference points coincide collapses to the constant
    /// `eng1`, so an un-calibrated channel can never divide by zero.
    pub fn apply(&self, raw: Option<f64>) -> Option<f64> {
        let value = raw?;
        if value.is_nan() {
            return Some(value);
        }
        if self.raw2 == self.raw1 {
            return Some(self.eng1);
        }
        Some(self.eng1 + (value - self.raw1) * (self.eng2 - self.eng1) / (self.raw2 - self.raw1))
    }

    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("raw1", self.raw1),
            ("eng1", self.eng1),
            ("raw2", self.raw2),
            ("eng2", self.eng2),
        ]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("calibration value {field} for {channel} must be a finite number")]
    NonFiniteValue {
        channel: ChannelId,
        field: &'static str,
    },
}

/// The full 7-channel calibration table.
///
/// An entry exists for every channel at all times; loading is best-effort and
/// editing goes through [`CalibrationTable::set_entry`], which validates the
/// numbers before they reach the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    entries: BTreeMap<ChannelId, CalibrationEntry>,
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            entries: ChannelId::ALL
                .iter()
                .map(|&id| (id, CalibrationEntry::default()))
                .collect(),
        }
    }
}

const FILE_VERSION: u32 = 1;

#[derive(Serialize)]
struct CalibrationFile {
    version: u32,
    channels: serde_yaml::Mapping,
}

impl CalibrationTable {
    /// Load the table from `path`.
    ///
    /// Calibration is best-effort: a missing file is created with defaults, a
    /// malformed file degrades to defaults, and individual missing or
    /// malformed channel entries keep their default values. This never fails
    /// the caller.
    pub fn load(path: &Path) -> Self {
        let mut table = Self::default();

        if !path.exists() {
            if let Err(e) = table.save(path) {
                log::warn!(
                    "could not create calibration file {}: {}",
                    path.display(),
                    e
                );
            }
            return table;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("could not read calibration file {}: {}", path.display(), e);
                return table;
            }
        };

        let doc: serde_yaml::Value = match serde_yaml::from_str(&text) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("malformed calibration file {}: {}", path.display(), e);
                return table;
            }
        };

        // A versioned file nests entries under `channels`; accept a bare
        // channel mapping as well.
        let channels = match doc.get("channels") {
            Some(nested) => nested,
            None => &doc,
        };

        for id in ChannelId::ALL {
            let key = id.to_string();
            let Some(value) = channels.get(key.as_str()) else {
                continue;
            };
            match serde_yaml::from_value::<CalibrationEntry>(value.clone()) {
                Ok(entry) => {
                    table.entries.insert(id, entry);
                }
                Err(e) => {
                    log::warn!("ignoring malformed calibration entry for {}: {}", id, e);
                }
            }
        }

        table
    }

    /// Serialize all 7 entries to `path`, overwriting any existing file.
    ///
    /// Channel order is fixed (`TC0..TC2`, then `AI0..AI3`) so the output is
    /// deterministic.
    pub fn save(&self, path: &Path) -> Result<(), CalibrationError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut channels = serde_yaml::Mapping::new();
        for (id, entry) in &self.entries {
            channels.insert(
                serde_yaml::Value::String(id.to_string()),
                serde_yaml::to_value(entry)?,
            );
        }

        let file = CalibrationFile {
            version: FILE_VERSION,
            channels,
        };
        std::fs::write(path, serde_yaml::to_string(&file)?)?;
        Ok(())
    }

    /// The entry for `id`. Entries exist for every channel.
    pub fn entry(&self, id: ChannelId) -> CalibrationEntry {
        self.entries.get(&id).copied().unwrap_or_default()
    }

    /// Replace the entry for `id`, rejecting non-finite reference points.
    pub fn set_entry(
        &mut self,
        id: ChannelId,
        entry: CalibrationEntry,
    ) -> Result<(), CalibrationError> {
        for (field, value) in entry.fields() {
            if !value.is_finite() {
                return Err(CalibrationError::NonFiniteValue { channel: id, field });
            }
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn reset_defaults(&mut self) {
        *self = Self::default();
    }

    /// Apply the channel's calibration to a raw reading.
    pub fn apply(&self, id: ChannelId, raw: Option<f64>) -> Option<f64> {
        self.entry(id).apply(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_display_and_parse() {
        for id in ChannelId::ALL {
            assert_eq!(id.to_string().parse::<ChannelId>().unwrap(), id);
        }
        assert!("TC3".parse::<ChannelId>().is_err());
        assert!("AI4".parse::<ChannelId>().is_err());
        assert!("DI0".parse::<ChannelId>().is_err());
    }

    #[test]
    fn test_interpolation_endpoints_are_exact() {
        let entry = CalibrationEntry::new(0.5, 100.0, 4.5, 900.0);
        assert_eq!(entry.apply(Some(0.5)), Some(100.0));
        assert_eq!(entry.apply(Some(4.5)), Some(900.0));
        // Midpoint lands on the line.
        assert_eq!(entry.apply(Some(2.5)), Some(500.0));
    }

    #[test]
    fn test_degenerate_entry_is_flat() {
        let entry = CalibrationEntry::new(2.0, 7.5, 2.0, 9.0);
        for x in [-100.0, 0.0, 2.0, 1e9] {
            assert_eq!(entry.apply(Some(x)), Some(7.5));
        }
        // The default entry is degenerate-safe too.
        let default = CalibrationEntry::default();
        assert_eq!(default.apply(Some(0.25)), Some(0.25));
    }

    #[test]
    fn test_sentinels_propagate() {
        let entry = CalibrationEntry::new(0.0, 10.0, 1.0, 20.0);
        assert_eq!(entry.apply(None), None);
        let out = entry.apply(Some(f64::NAN)).unwrap();
        assert!(out.is_nan());
    }

    #[test]
    fn test_set_entry_rejects_non_finite() {
        let mut table = CalibrationTable::default();
        let id = ChannelId::thermocouple(0);
        let bad = CalibrationEntry::new(0.0, f64::INFINITY, 1.0, 1.0);
        assert!(matches!(
            table.set_entry(id, bad),
            Err(CalibrationError::NonFiniteValue { field: "eng1", .. })
        ));
        assert_eq!(table.entry(id), CalibrationEntry::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");

        let mut table = CalibrationTable::default();
        table
            .set_entry(
                ChannelId::thermocouple(1),
                CalibrationEntry::new(0.1, -5.0, 9.9, 450.0),
            )
            .unwrap();
        table
            .set_entry(
                ChannelId::analog(3),
                CalibrationEntry::new(-1.0, 0.0, 1.0, 100.0),
            )
            .unwrap();

        table.save(&path).unwrap();
        let reloaded = CalibrationTable::load(&path);
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_save_orders_thermocouples_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");
        CalibrationTable::default().save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("version: 1"));
        let tc0 = text.find("TC0").unwrap();
        let ai0 = text.find("AI0").unwrap();
        assert!(tc0 < ai0);
    }

    #[test]
    fn test_load_creates_missing_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");

        let table = CalibrationTable::load(&path);
        assert_eq!(table, CalibrationTable::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");
        std::fs::write(&path, "]] not yaml {{").unwrap();
        assert_eq!(CalibrationTable::load(&path), CalibrationTable::default());

        std::fs::write(&path, "- just\n- a\n- list\n").unwrap();
        assert_eq!(CalibrationTable::load(&path), CalibrationTable::default());
    }

    #[test]
    fn test_load_keeps_defaults_for_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");
        std::fs::write(
            &path,
            concat!(
                "version: 1\n",
                "channels:\n",
                "  TC0:\n",
                "    raw1: 1.0\n",
                "    eng1: 50.0\n",
                "    raw2: 2.0\n",
                "    eng2: 150.0\n",
                "  TC1: not-a-mapping\n",
            ),
        )
        .unwrap();

        let table = CalibrationTable::load(&path);
        assert_eq!(
            table.entry(ChannelId::thermocouple(0)),
            CalibrationEntry::new(1.0, 50.0, 2.0, 150.0)
        );
        assert_eq!(
            table.entry(ChannelId::thermocouple(1)),
            CalibrationEntry::default()
        );
    }

    #[test]
    fn test_load_accepts_bare_channel_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");
        std::fs::write(&path, "AI0:\n  raw1: 0.0\n  eng1: 0.0\n  raw2: 5.0\n  eng2: 10.0\n")
            .unwrap();

        let table = CalibrationTable::load(&path);
        assert_eq!(
            table.entry(ChannelId::analog(0)),
            CalibrationEntry::new(0.0, 0.0, 5.0, 10.0)
        );
    }

    #[test]
    fn test_partial_entry_fields_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.yaml");
        std::fs::write(&path, "version: 1\nchannels:\n  AI2:\n    eng2: 42.0\n").unwrap();

        let table = CalibrationTable::load(&path);
        assert_eq!(
            table.entry(ChannelId::analog(2)),
            CalibrationEntry::new(0.0, 0.0, 1.0, 42.0)
        );
    }
}
