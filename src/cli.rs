use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "greenhouse-control",
    version,
    about = "Greenhouse climate control and simulation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler: control ticks and plan generation on fixed intervals (default)
    Run,
    /// Run one control tick now
    Tick {
        /// Only this greenhouse; all greenhouses when omitted
        #[arg(long)]
        code: Option<String>,
    },
    /// Generate forecast plans now
    Plan {
        /// Only this greenhouse; all greenhouses when omitted
        #[arg(long)]
        code: Option<String>,
    },
    /// Send a manual actuator command, e.g. IRRIGATION_ON or VENT_CLOSE
    Manual { code: String, action: String },
    /// Re-simulate a greenhouse's internal climate without actuator control
    Simulate { code: String },
    /// Show recent action log entries, newest first
    Logs {
        code: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Import plant profile YAML files into the database
    ImportProfiles {
        /// Directory of *.yaml profiles; defaults to `profiles_dir` from config
        dir: Option<PathBuf>,
    },
    /// Validate config and test the weather connection
    Check,
}
