//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "roast", version, about = "Roast BT estimation CLI")]
pub struct Cli {
    /// Path to config TOML (typed). A missing file falls back to built-in defaults.
    #[arg(long, value_name = "FILE", default_value = "etc/roast_config.toml")]
    pub config: PathBuf,

    /// Emit per-tick reports and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace). RUST_LOG wins when set;
    /// otherwise falls back to `logging.level` from the config, then "info".
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a live session from the simulated probe
    Run {
        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(long, value_name = "SECS")]
        duration_s: Option<f64>,
        /// Export the session to BASE.csv, BASE.samples.csv, BASE.events.csv and BASE.meta.json
        #[arg(long, value_name = "BASE")]
        export: Option<PathBuf>,
        /// Track readings without recording until stopped
        #[arg(long, action = ArgAction::SetTrue)]
        no_start: bool,
        /// Print only every Nth tick in human output
        #[arg(long, value_name = "N", default_value_t = 1)]
        every: usize,
    },
    /// Feed a recorded ET trace (exported session or `t_sec,et_c` CSV) through the pipeline
    Replay {
        /// Session CSV to replay
        #[arg(value_name = "FILE")]
        input: PathBuf,
        /// Export the recomputed session to BASE.*
        #[arg(long, value_name = "BASE")]
        export: Option<PathBuf>,
        /// Print only every Nth tick in human output
        #[arg(long, value_name = "N", default_value_t = 1)]
        every: usize,
    },
    /// Compute and store a probe calibration
    Calibrate {
        /// Where to write the calibration JSON (default: files.calibration from the config)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        #[command(subcommand)]
        mode: CalibrateMode,
    },
    /// Quick health check (config, profiles, probe)
    SelfCheck,
}

#[derive(Subcommand, Debug)]
pub enum CalibrateMode {
    /// Offset-only calibration from one reference reading
    OnePoint {
        /// Reference temperature (°C)
        #[arg(long)]
        actual_c: f64,
        /// Probe reading at the reference (°C)
        #[arg(long)]
        raw_c: f64,
    },
    /// Offset and scale from two reference readings
    TwoPoint {
        #[arg(long)]
        actual1_c: f64,
        #[arg(long)]
        raw1_c: f64,
        #[arg(long)]
        actual2_c: f64,
        #[arg(long)]
        raw2_c: f64,
    },
}
