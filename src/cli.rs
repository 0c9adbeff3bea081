//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// SliceHealth - weekly slice-health report for tissue-slicing experiments
///
/// Reads per-attempt record files, rolls them up per slice and per
/// preparation, and writes a styled two-sheet spreadsheet.
///
/// Examples:
///   slicehealth
///   slicehealth --yes --csv
///   slicehealth --start 240108 --end 240114
///   slicehealth --records-dir ./metadata --output-dir ./reports
///   slicehealth --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .slicehealth.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "SLICEHEALTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing per-attempt record files
    #[arg(long, value_name = "DIR", env = "SLICEHEALTH_RECORDS_DIR")]
    pub records_dir: Option<PathBuf>,

    /// Directory the report is written into
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// CSV table mapping specimen names to preparation names
    #[arg(long, value_name = "FILE")]
    pub specimen_table: Option<PathBuf>,

    /// CSV table mapping operator display names to logins
    #[arg(long, value_name = "FILE")]
    pub user_table: Option<PathBuf>,

    /// Report start date (YYMMDD)
    #[arg(long, value_name = "YYMMDD", requires = "end")]
    pub start: Option<String>,

    /// Report end date (YYMMDD)
    #[arg(long, value_name = "YYMMDD", requires = "start")]
    pub end: Option<String>,

    /// Accept the default window (Monday through today) without prompting
    #[arg(short, long, conflicts_with_all = ["start", "end"])]
    pub yes: bool,

    /// Also write the comma-separated prep summary
    #[arg(long)]
    pub csv: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .slicehealth.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                let start_day = crate::window::parse_yymmdd(start)
                    .map_err(|e| format!("Invalid --start: {}", e))?;
                let end_day = crate::window::parse_yymmdd(end)
                    .map_err(|e| format!("Invalid --end: {}", e))?;
                if start_day > end_day {
                    return Err(format!(
                        "Start date {} is after end date {}",
                        start, end
                    ));
                }
            }
            (None, None) => {}
            _ => return Err("--start and --end must be given together".to_string()),
        }

        if let Some(ref dir) = self.records_dir {
            if !dir.exists() {
                return Err(format!("Records directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Records path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
