//! Record discovery and flattening.
//!
//! Each record file describes one slice: slice-level fields at the top
//! level and one entry per recording attempt under `pipettes`. The loader
//! finds recently modified record files and turns every attempt into a flat
//! [`AttemptRecord`] that carries its slice's fields.

use crate::error::{ReportError, ReportResult};
use crate::models::AttemptRecord;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Form version assumed when a record does not declare one.
pub const DEFAULT_FORM_VERSION: &str = "1.0.0";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Criteria for picking record files out of a directory tree.
#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    /// Substring the file name must contain.
    pub experiment_tag: String,
    /// Only files modified within this many days are kept.
    pub max_age_days: Option<u64>,
}

/// Find record files under `dir`, sorted by path.
///
/// A missing or unreadable `dir` is an error rather than an empty result.
pub fn discover_records(dir: &Path, config: &DiscoverConfig) -> ReportResult<Vec<PathBuf>> {
    if fs::read_dir(dir).is_err() {
        return Err(ReportError::RecordsDirUnavailable {
            path: dir.to_path_buf(),
        });
    }

    let cutoff = config.max_age_days.and_then(|days| {
        SystemTime::now().checked_sub(Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)))
    });

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str().unwrap_or("")));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !matches_record_name(entry.path(), &config.experiment_tag)
        {
            continue;
        }

        if let Some(cutoff) = cutoff {
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            match modified {
                Some(time) if time >= cutoff => {}
                _ => continue,
            }
        }

        files.push(entry.into_path());
    }

    files.sort();
    info!("Found {} record files in {}", files.len(), dir.display());
    Ok(files)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn matches_record_name(path: &Path, experiment_tag: &str) -> bool {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    is_json && name.contains(experiment_tag)
}

/// Read and flatten every file, concatenating attempts in file order.
pub fn load_records(files: &[PathBuf], show_progress: bool) -> ReportResult<Vec<AttemptRecord>> {
    let progress = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} records")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut records = Vec::new();
    for path in files {
        let attempts = load_file(path)?;
        debug!("{}: {} attempts", path.display(), attempts.len());
        records.extend(attempts);
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!("Loaded {} attempts from {} files", records.len(), files.len());
    Ok(records)
}

/// Read one record file and flatten it.
pub fn load_file(path: &Path) -> ReportResult<Vec<AttemptRecord>> {
    let content = fs::read_to_string(path).map_err(|source| ReportError::RecordRead {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&content).map_err(|e| ReportError::MalformedRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    flatten_record(path, &json)
}

/// Turn one slice form into one [`AttemptRecord`] per attempt.
pub fn flatten_record(path: &Path, json: &Value) -> ReportResult<Vec<AttemptRecord>> {
    let form = json.as_object().ok_or_else(|| ReportError::MalformedRecord {
        path: path.to_path_buf(),
        reason: "top level is not an object".to_string(),
    })?;

    let version = form
        .get("formVersion")
        .map(scalar_text)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FORM_VERSION.to_string());
    debug!("{}: form version {}", path.display(), version);

    let attempts = match form.get("pipettes") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => {
            debug!("{}: no attempts recorded", path.display());
            return Ok(Vec::new());
        }
        Some(_) => {
            return Err(ReportError::MalformedRecord {
                path: path.to_path_buf(),
                reason: "`pipettes` is not an array".to_string(),
            })
        }
    };

    let field = |key: &str| form.get(key).map(scalar_text).unwrap_or_default();
    let slice = AttemptRecord {
        slice_name: field("limsSpecName"),
        operator: field("rigOperator"),
        rig: field("rigNumber"),
        timestamp: field("date"),
        acsf_date: field("acsfProductionDate"),
        slice_quality: field("sliceQuality"),
        ..AttemptRecord::default()
    };

    if slice.slice_name.is_empty() {
        warn!("{}: record has no specimen name", path.display());
    }

    let mut records = Vec::with_capacity(attempts.len());
    for attempt in attempts {
        let approach = attempt.get("approach");
        // Only an absent or null score is missing; blank text goes on to fail parsing.
        let health = approach
            .and_then(|a| a.get("sliceHealth"))
            .filter(|h| !h.is_null())
            .map(scalar_text);

        records.push(AttemptRecord {
            status: attempt.get("status").map(scalar_text).unwrap_or_default(),
            pilot_name: approach
                .and_then(|a| a.get("pilotName"))
                .map(scalar_text)
                .unwrap_or_default(),
            health,
            ..slice.clone()
        });
    }

    Ok(records)
}

/// Render a JSON scalar as text. Null becomes empty; containers are serialized.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/records")
    }

    #[test]
    fn test_flatten_copies_slice_fields() {
        let json = json!({
            "formVersion": "2.0.1",
            "limsSpecName": "S1",
            "date": "2024-01-09 10:15:00",
            "acsfProductionDate": "01/05/2024",
            "rigOperator": "Jane Doe",
            "rigNumber": 4,
            "sliceQuality": "Wave of Death present",
            "pipettes": [
                {"status": "SUCCESS", "approach": {"pilotName": "Standard", "sliceHealth": "3"}},
                {"status": "FAILURE", "approach": {"pilotName": "Standard", "sliceHealth": 2.5}}
            ]
        });

        let records = flatten_record(Path::new("PS_S1.json"), &json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slice_name, "S1");
        assert_eq!(records[0].rig, "4");
        assert_eq!(records[0].status, "SUCCESS");
        assert_eq!(records[0].health.as_deref(), Some("3"));
        assert_eq!(records[1].health.as_deref(), Some("2.5"));
        assert_eq!(records[1].operator, "Jane Doe");
        assert_eq!(records[1].slice_quality, "Wave of Death present");
        assert_eq!(records[1].pilot_name, "Standard");
    }

    #[test]
    fn test_flatten_missing_optional_fields() {
        let json = json!({
            "limsSpecName": "S2",
            "date": "2024-01-09 10:15:00",
            "pipettes": [{"status": "SUCCESS"}, {"status": "SUCCESS", "approach": {"sliceHealth": null}}]
        });

        let records = flatten_record(Path::new("PS_S2.json"), &json).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.health.is_none()));
        assert!(records.iter().all(|r| r.pilot_name.is_empty()));
        assert!(records.iter().all(|r| r.acsf_date.is_empty()));
    }

    #[test]
    fn test_flatten_without_attempts() {
        let json = json!({"limsSpecName": "S3"});
        assert!(flatten_record(Path::new("PS_S3.json"), &json).unwrap().is_empty());
    }

    #[test]
    fn test_flatten_rejects_non_object() {
        let err = flatten_record(Path::new("PS_bad.json"), &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ReportError::MalformedRecord { .. }));

        let err = flatten_record(Path::new("PS_bad.json"), &json!({"pipettes": "x"})).unwrap_err();
        assert!(matches!(err, ReportError::MalformedRecord { .. }));
    }

    #[test]
    fn test_load_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PS_broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ReportError::MalformedRecord { .. }));
    }

    #[test]
    fn test_discover_filters_by_name_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("PS_a.json"), "{}").unwrap();
        fs::write(dir.path().join("nested/PS_b.json"), "{}").unwrap();
        fs::write(dir.path().join(".hidden/PS_c.json"), "{}").unwrap();
        fs::write(dir.path().join("OTHER_d.json"), "{}").unwrap();
        fs::write(dir.path().join("PS_e.txt"), "{}").unwrap();

        let config = DiscoverConfig {
            experiment_tag: "PS".to_string(),
            max_age_days: Some(1),
        };
        let files = discover_records(dir.path(), &config).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["PS_a.json", "PS_b.json"]);
    }

    #[test]
    fn test_blank_health_is_kept_as_text() {
        let json = json!({
            "limsSpecName": "S4",
            "date": "2024-01-09 10:15:00",
            "pipettes": [
                {"status": "SUCCESS", "approach": {"sliceHealth": "3"}},
                {"status": "SUCCESS", "approach": {"sliceHealth": ""}}
            ]
        });

        let records = flatten_record(Path::new("PS_S4.json"), &json).unwrap();
        assert_eq!(records[0].health.as_deref(), Some("3"));
        assert_eq!(records[1].health.as_deref(), Some(""));
    }

    #[test]
    fn test_blank_health_aborts_normalization() {
        use crate::analysis::normalizer::normalize;
        use crate::config::FilterConfig;
        use crate::lookup::{SpecimenTable, UserTable};
        use crate::window::DateRange;
        use chrono::NaiveDate;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PS_S5.json");
        fs::write(
            &path,
            r#"{"limsSpecName": "S5", "date": "2024-01-09 10:15:00",
               "pipettes": [{"status": "SUCCESS", "approach": {"sliceHealth": "3"}},
                            {"status": "SUCCESS", "approach": {"sliceHealth": ""}}]}"#,
        )
        .unwrap();

        let records = load_file(&path).unwrap();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
        );
        let err = normalize(
            &records,
            &range,
            &FilterConfig::default(),
            &SpecimenTable::default(),
            &UserTable::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidHealthScore { .. }));
    }

    #[test]
    fn test_load_file_missing_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PS_gone.json");
        match load_file(&path).unwrap_err() {
            ReportError::RecordRead { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_discover_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiscoverConfig {
            experiment_tag: "PS".to_string(),
            max_age_days: None,
        };

        let err = discover_records(&dir.path().join("does-not-exist"), &config).unwrap_err();
        assert!(matches!(err, ReportError::RecordsDirUnavailable { .. }));

        let file = dir.path().join("PS_a.json");
        fs::write(&file, "{}").unwrap();
        let err = discover_records(&file, &config).unwrap_err();
        assert!(matches!(err, ReportError::RecordsDirUnavailable { .. }));
    }

    #[test]
    fn test_discover_huge_age_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("PS_a.json"), "{}").unwrap();
        let config = DiscoverConfig {
            experiment_tag: "PS".to_string(),
            max_age_days: Some(u64::MAX),
        };
        assert_eq!(discover_records(dir.path(), &config).unwrap().len(), 1);
    }

    #[test]
    fn test_load_fixture_directory() {
        let config = DiscoverConfig {
            experiment_tag: "PS".to_string(),
            max_age_days: None,
        };
        let files = discover_records(&fixtures_dir(), &config).unwrap();
        assert_eq!(files.len(), 3);

        let records = load_records(&files, false).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(
            records.iter().filter(|r| r.slice_name == "H24.03.001.11.01.01").count(),
            3
        );
    }
}
