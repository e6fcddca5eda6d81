//! End-to-end pipeline test against the simulated chassis: connect, sample,
//! calibrate, log to CSV, and tear down.

use cdaq_panel::{
    run_ticks, AcquisitionController, AcquisitionState, CalibrationEntry, CalibrationTable,
    ChannelId, DisplaySink, PanelConfig, PanelSnapshot, SimDevice, PLACEHOLDER,
};
use std::time::Duration;

fn sim_config(log_dir: &std::path::Path) -> PanelConfig {
    let mut config = PanelConfig::new("SimChassisMod4", "SimChassisMod3");
    config.update_period = Duration::from_millis(50);
    config.log_dir = log_dir.to_path_buf();
    config
}

#[test]
fn full_pipeline_with_mid_run_logging() {
    let dir = tempfile::tempdir().unwrap();
    let mut panel = AcquisitionController::new(
        SimDevice::new(),
        sim_config(dir.path()),
        CalibrationTable::default(),
    );

    panel.connect().unwrap();
    assert_eq!(panel.state(), AcquisitionState::Connected);
    panel.start().unwrap();
    assert_eq!(panel.state(), AcquisitionState::Running);

    // A few un-logged ticks: every channel produces a finite reading.
    for _ in 0..3 {
        let snapshot = panel.tick().unwrap();
        assert_eq!(snapshot.thermocouples.len(), 3);
        assert_eq!(snapshot.analog_inputs.len(), 4);
        for readout in snapshot.readouts() {
            assert!(readout.raw.unwrap().is_finite());
            assert_ne!(readout.text, PLACEHOLDER);
        }
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // Enable logging mid-run: exactly one session opens.
    panel.set_logging_enabled(true).unwrap();
    let log_path = panel.log_session_path().unwrap().to_path_buf();
    for _ in 0..3 {
        panel.tick().unwrap();
    }

    let text = std::fs::read_to_string(&log_path).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("timestamp,tc0_raw"));
    assert!(header.ends_with("ai3_cal"));
    assert_eq!(lines.count(), 3);

    // Disable mid-run closes the session; the file stays behind.
    panel.set_logging_enabled(false).unwrap();
    assert!(panel.log_session_path().is_none());
    assert!(log_path.exists());

    panel.stop();
    assert_eq!(panel.state(), AcquisitionState::Stopped);

    // Restart without reconnecting.
    panel.start().unwrap();
    panel.tick().unwrap();

    panel.disconnect();
    assert_eq!(panel.state(), AcquisitionState::Disconnected);
    let snapshot = panel.snapshot();
    assert!(snapshot.readouts().all(|r| r.raw.is_none()));
    assert!(snapshot.readouts().all(|r| r.text == PLACEHOLDER));
}

#[test]
fn calibration_is_applied_to_live_readings() {
    let dir = tempfile::tempdir().unwrap();
    let cal_path = dir.path().join("calibration.yaml");

    // Map 0..5 V on AI0 to 0..100 engineering units and persist it the way
    // the edit workflow would.
    let mut table = CalibrationTable::default();
    table
        .set_entry(
            ChannelId::analog(0),
            CalibrationEntry::new(0.0, 0.0, 5.0, 100.0),
        )
        .unwrap();
    table.save(&cal_path).unwrap();

    let mut panel = AcquisitionController::new(
        SimDevice::new(),
        sim_config(dir.path()),
        CalibrationTable::load(&cal_path),
    );
    panel.connect().unwrap();
    panel.start().unwrap();

    let snapshot = panel.tick().unwrap();
    let ai0 = &snapshot.analog_inputs[0];
    let raw = ai0.raw.unwrap();
    let expected = raw * 20.0;
    assert!((ai0.calibrated.unwrap() - expected).abs() < 1e-9);

    // Uncalibrated channels pass through the default entry untouched.
    let ai1 = &snapshot.analog_inputs[1];
    assert_eq!(ai1.calibrated, ai1.raw);

    panel.disconnect();
}

struct Recorder {
    snapshots: Vec<PanelSnapshot>,
}

impl DisplaySink for Recorder {
    fn update(&mut self, snapshot: &PanelSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

#[test]
fn tick_runner_feeds_the_display_sink() {
    let dir = tempfile::tempdir().unwrap();
    let mut panel = AcquisitionController::new(
        SimDevice::new(),
        sim_config(dir.path()),
        CalibrationTable::default(),
    );
    panel.connect().unwrap();
    panel.start().unwrap();

    let mut recorder = Recorder {
        snapshots: Vec::new(),
    };
    let mut remaining = 3usize;
    run_ticks(&mut panel, &mut recorder, |_snapshot| {
        remaining -= 1;
        remaining > 0
    })
    .unwrap();

    assert_eq!(recorder.snapshots.len(), 3);
    assert!(recorder
        .snapshots
        .iter()
        .all(|s| s.state == AcquisitionState::Running));

    panel.disconnect();
}
