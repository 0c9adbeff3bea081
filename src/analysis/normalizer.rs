//! Field cleanup between the loader and the aggregators.
//!
//! Drops non-data rows, resolves prep names and operator logins, parses
//! timestamps and health scores, and keeps only attempts inside the report
//! window. Anything unparseable aborts the run.

use crate::config::FilterConfig;
use crate::error::{ReportError, ReportResult};
use crate::lookup::{PrepLookup, UserTable};
use crate::models::{AttemptRecord, AttemptStatus, NormalizedAttempt};
use crate::window::DateRange;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// Two-digit years first: "%Y" would happily read "24" as the year 24.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

/// Normalize raw attempts for the given report window.
pub fn normalize(
    records: &[AttemptRecord],
    range: &DateRange,
    filter: &FilterConfig,
    preps: &dyn PrepLookup,
    users: &UserTable,
) -> ReportResult<Vec<NormalizedAttempt>> {
    let mut excluded = 0usize;
    let mut unknown_preps = 0usize;
    let mut parsed = Vec::with_capacity(records.len());

    for record in records {
        if is_excluded(record, filter) {
            excluded += 1;
            continue;
        }

        let prep_name = match preps.prep_for(&record.slice_name) {
            Some(prep) => prep,
            None => {
                unknown_preps += 1;
                debug!(
                    "No prep for specimen {:?}; using {:?}",
                    record.slice_name, filter.unknown_prep
                );
                filter.unknown_prep.clone()
            }
        };

        let datetime = parse_timestamp(&record.timestamp).ok_or_else(|| {
            ReportError::InvalidTimestamp {
                slice: record.slice_name.clone(),
                value: record.timestamp.clone(),
            }
        })?;

        parsed.push(NormalizedAttempt {
            slice_name: record.slice_name.clone(),
            prep_name,
            operator: users.resolve(&record.operator).to_string(),
            rig: record.rig.clone(),
            day: datetime.date(),
            time: datetime.format("%H:%M").to_string(),
            acsf_date: normalize_acsf_date(record)?,
            status: AttemptStatus::from(record.status.as_str()),
            slice_quality: record.slice_quality.clone(),
            health: parse_health(record)?,
        });
    }

    let before_window = parsed.len();
    parsed.retain(|a| range.contains(a.day));

    info!(
        "Normalized {} of {} attempts ({} excluded, {} outside window, {} without a known prep)",
        parsed.len(),
        records.len(),
        excluded,
        before_window - parsed.len(),
        unknown_preps
    );

    Ok(parsed)
}

/// Non-data rows: excluded pilot tags and excluded operators.
///
/// Matching uses the operator as written on the form, before any remap.
fn is_excluded(record: &AttemptRecord, filter: &FilterConfig) -> bool {
    filter
        .excluded_pilot_names
        .iter()
        .any(|p| *p == record.pilot_name)
        || filter.excluded_operators.iter().any(|o| *o == record.operator)
}

/// Parse an attempt timestamp, keeping the recorded wall-clock time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| parse_date(value).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn normalize_acsf_date(record: &AttemptRecord) -> ReportResult<String> {
    let value = record.acsf_date.trim();
    if value.is_empty() {
        return Ok(String::new());
    }

    parse_date(value)
        .or_else(|| parse_timestamp(value).map(|dt| dt.date()))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| ReportError::InvalidAcsfDate {
            slice: record.slice_name.clone(),
            value: record.acsf_date.clone(),
        })
}

fn parse_health(record: &AttemptRecord) -> ReportResult<Option<f64>> {
    let Some(raw) = record.health.as_deref() else {
        return Ok(None);
    };

    match raw.trim().parse::<f64>() {
        Ok(score) if score.is_finite() => Ok(Some(score)),
        _ => Err(ReportError::InvalidHealthScore {
            slice: record.slice_name.clone(),
            value: raw.to_string(),
        }),
    }
}
