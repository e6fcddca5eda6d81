// Inspect and edit the persisted two-point calibration table from the
// command line. The acquisition pipeline picks the file up on next load.

use cdaq_panel::{CalibrationEntry, CalibrationTable, ChannelId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Edit the panel's two-point calibration table")]
struct Args {
    /// Calibration file
    #[arg(long, default_value = "calibration.yaml")]
    path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print all 7 entries
    Show,
    /// Set one channel's calibration points
    Set {
        /// Channel identifier (TC0..TC2, AI0..AI3)
        channel: String,
        raw1: f64,
        eng1: f64,
        raw2: f64,
        eng2: f64,
    },
    /// Reset every channel to the identity-like default
    Reset,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut table = CalibrationTable::load(&args.path);

    match args.command {
        Command::Show => {
            for id in ChannelId::ALL {
                let entry = table.entry(id);
                println!(
                    "{}: ({}, {}) -> ({}, {})",
                    id, entry.raw1, entry.eng1, entry.raw2, entry.eng2
                );
            }
        }
        Command::Set {
            channel,
            raw1,
            eng1,
            raw2,
            eng2,
        } => {
            let id: ChannelId = channel.parse()?;
            table.set_entry(id, CalibrationEntry::new(raw1, eng1, raw2, eng2))?;
            table.save(&args.path)?;
            println!("Saved {} to {}", id, args.path.display());
        }
        Command::Reset => {
            table.reset_defaults();
            table.save(&args.path)?;
            println!("Reset calibration in {}", args.path.display());
        }
    }

    Ok(())
}
