// Live readout of the simulated chassis: connect, start, tick for a while,
// optionally logging every update to CSV.

use cdaq_panel::{
    run_ticks, AcquisitionController, CalibrationTable, DisplaySink, PanelConfig,
    PanelSnapshot, SimDevice,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(about = "Live readout of the simulated cDAQ chassis")]
struct Args {
    /// UI update period in milliseconds
    #[arg(long, default_value_t = 200)]
    period_ms: u64,

    /// Number of ticks to run before exiting
    #[arg(long, default_value_t = 25)]
    ticks: usize,

    /// Thermocouple type (J, K, T, E, N, R, S or B)
    #[arg(long, default_value = "K")]
    tc_type: String,

    /// Calibration file
    #[arg(long, default_value = "calibration.yaml")]
    calibration: PathBuf,

    /// Enable CSV logging into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

struct Console;

impl DisplaySink for Console {
    fn update(&mut self, snapshot: &PanelSnapshot) {
        let line: Vec<String> = snapshot
            .readouts()
            .map(|r| format!("{}={}", r.id, r.text))
            .collect();
        println!("[{}] {}", snapshot.state.as_str(), line.join("  "));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = PanelConfig::new("SimChassisMod4", "SimChassisMod3");
    config.update_period = Duration::from_millis(args.period_ms);
    config.tc_type = args.tc_type.parse()?;
    if let Some(dir) = args.log_dir {
        config.logging_enabled = true;
        config.log_dir = dir;
    }

    let calibration = CalibrationTable::load(&args.calibration);
    let mut panel = AcquisitionController::new(SimDevice::new(), config, calibration);

    panel.connect()?;
    println!("{}", panel.state().as_str());

    panel.start()?;
    if let Some(path) = panel.log_session_path() {
        println!("Logging to {}", path.display());
    }

    let mut remaining = args.ticks;
    run_ticks(&mut panel, &mut Console, |_snapshot| {
        remaining = remaining.saturating_sub(1);
        remaining > 0
    })?;

    panel.stop();
    panel.disconnect();
    println!("{}", panel.state().as_str());
    Ok(())
}
