//! Command-line interface for Wavenote
//!
//! Handles argument parsing and logging configuration.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Wavenote - Voice recorder with live waveforms
#[derive(Parser, Debug)]
#[command(name = "wavenote")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace, -vvvv = all deps
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Recordings directory (overrides settings)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List recordings, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Record raw s16le mono PCM until end of input, a time limit or Ctrl-C
    Record {
        /// Read PCM from a file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<f64>,
    },
    /// Play a recording with a synchronized progress marker
    Play {
        name: String,
        /// Only track progress against the clock, without a sound device
        #[arg(long)]
        silent: bool,
    },
    /// Print a recording's waveform
    Show {
        name: String,
        /// Emit the SVG path for a box of this width
        #[arg(long)]
        width: Option<f32>,
        /// Height of the SVG box
        #[arg(long, default_value_t = 100.0)]
        height: f32,
    },
    /// Rename a recording and its waveform
    Rename { name: String, new_name: String },
    /// Delete a recording and its waveform
    Delete { name: String },
    /// Print the effective settings as JSON
    Config {
        /// Write them to the settings file
        #[arg(long)]
        save: bool,
    },
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Convert `--seconds` into a recording time limit
pub fn record_limit(seconds: Option<f64>) -> Result<Option<Duration>, String> {
    let Some(seconds) = seconds else {
        return Ok(None);
    };
    if seconds <= 0.0 {
        return Err("--seconds must be a positive number".to_string());
    }
    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|e| format!("--seconds {} is out of range: {}", seconds, e))
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    builder.filter_module("wavenote", args.log_level());

    if args.verbose >= 4 {
        builder.filter_level(args.log_level());
    }

    builder.format_timestamp_millis().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let args = Args::parse_from(["wavenote", "-vv", "list"]);
        assert_eq!(args.log_level(), LevelFilter::Debug);

        let args = Args::parse_from(["wavenote", "list", "--quiet"]);
        assert_eq!(args.log_level(), LevelFilter::Error);
    }

    #[test]
    fn test_record_limit() {
        assert_eq!(record_limit(None), Ok(None));
        assert_eq!(record_limit(Some(2.5)), Ok(Some(Duration::from_millis(2500))));
        assert!(record_limit(Some(0.0)).is_err());
        assert!(record_limit(Some(-1.0)).is_err());
        assert!(record_limit(Some(f64::NAN)).is_err());
        assert!(record_limit(Some(f64::INFINITY)).is_err());
        assert!(record_limit(Some(1e300)).is_err());
    }

    #[test]
    fn test_subcommands() {
        let args = Args::parse_from(["wavenote", "--dir", "/tmp/r", "rename", "a", "b"]);
        assert_eq!(args.dir, Some(PathBuf::from("/tmp/r")));
        assert!(matches!(
            args.command,
            Command::Rename { ref name, ref new_name } if name == "a" && new_name == "b"
        ));

        let args = Args::parse_from(["wavenote", "play", "take", "--silent"]);
        assert!(matches!(
            args.command,
            Command::Play { ref name, silent: true } if name == "take"
        ));

        let args = Args::parse_from(["wavenote", "record", "--seconds", "2.5"]);
        assert!(matches!(
            args.command,
            Command::Record { input: None, seconds: Some(s) } if s == 2.5
        ));
    }
}
