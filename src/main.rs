//! SliceHealth - weekly slice-health QC report
//!
//! A CLI tool that reads per-attempt tissue-slicing records, rolls them up
//! per slice and per preparation, and writes a styled two-sheet spreadsheet.
//!
//! Exit codes:
//!   0 - Report written
//!   1 - Runtime error (bad input data, missing tables, locked output, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod lookup;
mod models;
mod report;
mod window;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use loader::DiscoverConfig;
use lookup::{SpecimenTable, UserTable};
use report::ReportPaths;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use window::DateRange;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("SliceHealth v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Report failed: {:#}", e);
        eprintln!("\n❌ Error: {}", user_message(&e));
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .slicehealth.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize directories, exclusions, and report styles.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete report workflow.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let today = Local::now().date_naive();
    let range = select_range(&args, today)?;
    let (start, end) = range.label();
    info!("Report window: {} to {}", start, end);

    // Discovery looks back from today, with slack for late file edits.
    let max_age_days = range.days_since_start(today) + config.input.scan_buffer_days;

    if !args.quiet {
        println!("📂 Reading records from: {}", config.input.records_dir.display());
    }
    let outcome = generate(&config, &range, Some(max_age_days), !args.quiet)?;

    if !args.quiet {
        println!("\n📊 Report Summary:");
        println!("   Window: {} to {}", start, end);
        println!("   Record files: {}", outcome.files);
        println!("   Attempts loaded: {}", outcome.attempts);
        println!(
            "   Attempts in window: {} ({} success, {} failure)",
            outcome.window_attempts, outcome.successes, outcome.failures
        );
        println!("   Slices: {}", outcome.slices);
        println!("   Preps: {}", outcome.preps);
        if !outcome.operators.is_empty() {
            println!("   Operators: {}", outcome.operators.join(", "));
        }
        println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
        println!("\n✅ Report saved to: {}", outcome.paths.xlsx.display());
        if config.report.write_csv {
            println!("   CSV saved to: {}", outcome.paths.csv.display());
        }
    }

    Ok(())
}

/// Counts and destinations from one report run.
#[derive(Debug)]
struct RunOutcome {
    files: usize,
    attempts: usize,
    window_attempts: usize,
    successes: usize,
    failures: usize,
    slices: usize,
    preps: usize,
    /// Operators seen in the window, with their short tag when known.
    operators: Vec<String>,
    paths: ReportPaths,
}

/// Load, aggregate, and write the report for `range`.
fn generate(
    config: &Config,
    range: &DateRange,
    max_age_days: Option<u64>,
    show_progress: bool,
) -> Result<RunOutcome> {
    let specimens = SpecimenTable::load(&config.input.specimen_table)?;
    let users = UserTable::load(&config.input.user_table)?;
    if specimens.is_empty() {
        warn!(
            "Specimen table {} is empty; every slice will use prep {:?}",
            config.input.specimen_table.display(),
            config.filter.unknown_prep
        );
    }

    let discover = DiscoverConfig {
        experiment_tag: config.input.experiment_tag.clone(),
        max_age_days,
    };
    let files = loader::discover_records(&config.input.records_dir, &discover)?;
    if files.is_empty() {
        warn!(
            "No record files found in {}",
            config.input.records_dir.display()
        );
    }
    let records = loader::load_records(&files, show_progress)?;

    let aggregates =
        analysis::build_report(&records, range, &config.filter, &specimens, &users)?;
    if aggregates.slices.is_empty() {
        warn!("No attempts fall inside the report window");
    }

    let paths = report::output_paths(&config.report.output_dir, &config.report.base_name, range);
    report::write_workbook(
        &paths.xlsx,
        &aggregates.preps,
        &aggregates.slices,
        &config.report,
    )?;
    if config.report.write_csv {
        report::write_prep_csv(&paths.csv, &aggregates.preps)?;
    }

    let operators: BTreeSet<&str> = aggregates
        .slices
        .iter()
        .map(|s| s.user.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    let operators = operators
        .into_iter()
        .map(|login| match users.display_for(login) {
            Some(tag) => format!("{} ({})", login, tag),
            None => login.to_string(),
        })
        .collect();

    Ok(RunOutcome {
        files: files.len(),
        attempts: records.len(),
        window_attempts: aggregates.slices.iter().map(|s| s.attempt_count).sum(),
        successes: aggregates.slices.iter().map(|s| s.success_count).sum(),
        failures: aggregates.slices.iter().map(|s| s.fail_count).sum(),
        slices: aggregates.slices.len(),
        preps: aggregates.preps.len(),
        operators,
        paths,
    })
}

/// Pick the report window from the command line or interactively.
fn select_range(args: &Args, today: NaiveDate) -> Result<DateRange> {
    if let (Some(start), Some(end)) = (&args.start, &args.end) {
        return Ok(DateRange::new(
            window::parse_yymmdd(start)?,
            window::parse_yymmdd(end)?,
        ));
    }

    if args.yes {
        return Ok(window::default_range(today));
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    window::prompt_range(&mut input, &mut output, today)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// The message shown to the user: report errors speak for themselves,
/// anything else keeps its context chain.
fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<error::ReportError>() {
        Some(report_err) => report_err.to_string(),
        None => format!("{:#}", err),
    }
}
