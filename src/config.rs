//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.slicehealth.toml` files. Everything the pipeline needs to know about
//! directories, exclusions, and spreadsheet styling lives here and is passed
//! in explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".slicehealth.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input locations.
    #[serde(default)]
    pub input: InputConfig,

    /// Row exclusion and lookup policy.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Output and styling.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where records and reference tables are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding per-attempt record files.
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,

    /// CSV table with `specimen_name,prep_name` columns.
    #[serde(default = "default_specimen_table")]
    pub specimen_table: PathBuf,

    /// CSV table with `name,login,p_user` columns.
    #[serde(default = "default_user_table")]
    pub user_table: PathBuf,

    /// Substring a record file name must contain.
    #[serde(default = "default_experiment_tag")]
    pub experiment_tag: String,

    /// Extra days of modification-time slack when scanning for records.
    #[serde(default = "default_scan_buffer_days")]
    pub scan_buffer_days: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            records_dir: default_records_dir(),
            specimen_table: default_specimen_table(),
            user_table: default_user_table(),
            experiment_tag: default_experiment_tag(),
            scan_buffer_days: default_scan_buffer_days(),
        }
    }
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("all-metadata-files")
}

fn default_specimen_table() -> PathBuf {
    PathBuf::from("jem-constants/specimen_prep.csv")
}

fn default_user_table() -> PathBuf {
    PathBuf::from("jem-constants/ps_user_info.csv")
}

fn default_experiment_tag() -> String {
    "PS".to_string()
}

fn default_scan_buffer_days() -> u64 {
    3
}

/// Which rows are dropped before aggregation, and the lookup-miss policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Attempts whose pilot tag matches one of these are not data.
    #[serde(default = "default_excluded_pilot_names")]
    pub excluded_pilot_names: Vec<String>,

    /// Operators whose attempts are left out of the report.
    #[serde(default = "default_excluded_operators")]
    pub excluded_operators: Vec<String>,

    /// Prep name used when a specimen has no known preparation.
    #[serde(default = "default_unknown_prep")]
    pub unknown_prep: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_pilot_names: default_excluded_pilot_names(),
            excluded_operators: default_excluded_operators(),
            unknown_prep: default_unknown_prep(),
        }
    }
}

fn default_excluded_pilot_names() -> Vec<String> {
    vec!["Tissue_Touch".to_string()]
}

fn default_excluded_operators() -> Vec<String> {
    vec!["davidre".to_string()]
}

fn default_unknown_prep() -> String {
    "unknown".to_string()
}

/// Cell style for one role in the spreadsheet.
///
/// In the config file each role is a partial table: fields it leaves out
/// keep that role's default, background included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleConfig {
    pub font_name: String,
    pub font_size: f64,
    /// `left`, `center`, or `right`.
    pub align: String,
    pub bold: bool,
    pub num_format: String,
    /// Background fill as `#rrggbb`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 10.0,
            align: "left".to_string(),
            bold: false,
            num_format: "0.00".to_string(),
            bg_color: None,
        }
    }
}

impl StyleConfig {
    /// The normal style with a background fill.
    pub fn with_background(color: &str) -> Self {
        Self {
            bg_color: Some(color.to_string()),
            ..Self::default()
        }
    }
}

/// A style table as written in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StyleOverride {
    font_name: Option<String>,
    font_size: Option<f64>,
    align: Option<String>,
    bold: Option<bool>,
    num_format: Option<String>,
    bg_color: Option<String>,
}

impl StyleOverride {
    fn apply(self, base: StyleConfig) -> StyleConfig {
        StyleConfig {
            font_name: self.font_name.unwrap_or(base.font_name),
            font_size: self.font_size.unwrap_or(base.font_size),
            align: self.align.unwrap_or(base.align),
            bold: self.bold.unwrap_or(base.bold),
            num_format: self.num_format.unwrap_or(base.num_format),
            bg_color: self.bg_color.or(base.bg_color),
        }
    }
}

fn role_style<'de, D: Deserializer<'de>>(
    deserializer: D,
    base: StyleConfig,
) -> Result<StyleConfig, D::Error> {
    Ok(StyleOverride::deserialize(deserializer)?.apply(base))
}

fn normal_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StyleConfig, D::Error> {
    role_style(deserializer, StyleConfig::default())
}

fn prep_header_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StyleConfig, D::Error> {
    role_style(deserializer, default_prep_header())
}

fn slice_header_style<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<StyleConfig, D::Error> {
    role_style(deserializer, default_slice_header())
}

fn issue_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StyleConfig, D::Error> {
    role_style(deserializer, default_issue())
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the report files are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base name shared by the spreadsheet and the CSV export.
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// Width applied to every report column.
    #[serde(default = "default_column_width")]
    pub column_width: f64,

    /// Also write the comma-separated prep summary.
    #[serde(default)]
    pub write_csv: bool,

    #[serde(default, deserialize_with = "normal_style")]
    pub normal: StyleConfig,

    #[serde(default = "default_prep_header", deserialize_with = "prep_header_style")]
    pub prep_header: StyleConfig,

    #[serde(default = "default_slice_header", deserialize_with = "slice_header_style")]
    pub slice_header: StyleConfig,

    #[serde(default = "default_issue", deserialize_with = "issue_style")]
    pub issue: StyleConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            base_name: default_base_name(),
            column_width: default_column_width(),
            write_csv: false,
            normal: StyleConfig::default(),
            prep_header: default_prep_header(),
            slice_header: default_slice_header(),
            issue: default_issue(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_base_name() -> String {
    "ps_slicehealth_report".to_string()
}

fn default_column_width() -> f64 {
    18.0
}

fn default_prep_header() -> StyleConfig {
    StyleConfig::with_background("#998ec3")
}

fn default_slice_header() -> StyleConfig {
    StyleConfig::with_background("#f1a340")
}

fn default_issue() -> StyleConfig {
    StyleConfig::with_background("#fee0d2")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.records_dir {
            self.input.records_dir = dir.clone();
        }
        if let Some(ref table) = args.specimen_table {
            self.input.specimen_table = table.clone();
        }
        if let Some(ref table) = args.user_table {
            self.input.user_table = table.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.report.output_dir = dir.clone();
        }

        if args.csv {
            self.report.write_csv = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
