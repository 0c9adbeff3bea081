//! Data models for the slice-health report.
//!
//! Records flow strictly one way: [`AttemptRecord`] rows come out of the
//! loader, become [`NormalizedAttempt`]s, roll up into [`SliceSummary`]
//! rows and finally into [`PrepSummary`] rows.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Column order of the `slice_summary` sheet.
pub const SLICE_COLUMNS: [&str; 10] = [
    "day",
    "slice_name",
    "time",
    "mean_health",
    "slice_success_rate",
    "slice_quality",
    "attempt_count",
    "user",
    "rig",
    "acsf_date",
];

/// Column order of the `prep_summary` sheet.
pub const PREP_COLUMNS: [&str; 14] = [
    "day",
    "prep_name",
    "first_time",
    "last_time",
    "mean_health",
    "slice_success_rate",
    "wov_fraction",
    "uneven_fraction",
    "damaged_fraction",
    "attempt_count",
    "user",
    "rig",
    "acsf_date",
    "slice_name",
];

/// Outcome recorded for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    /// Any of the `SUCCESS` variants.
    Success,
    /// Exactly `FAILURE`.
    Failure,
    /// Anything else, kept verbatim.
    Other(String),
}

impl AttemptStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AttemptStatus::Failure)
    }
}

impl From<&str> for AttemptStatus {
    fn from(s: &str) -> Self {
        match s {
            "SUCCESS" | "SUCCESS (high confidence)" | "SUCCESS (low confidence)" => {
                AttemptStatus::Success
            }
            "FAILURE" => AttemptStatus::Failure,
            other => AttemptStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Success => write!(f, "SUCCESS"),
            AttemptStatus::Failure => write!(f, "FAILURE"),
            AttemptStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One flattened slicing attempt, exactly as read from a record file.
///
/// All values are kept as text; interpretation happens in the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptRecord {
    /// Specimen (slice) identifier.
    pub slice_name: String,
    /// Operator as entered on the form (display name or login).
    pub operator: String,
    /// Rig identifier.
    pub rig: String,
    /// Attempt timestamp.
    pub timestamp: String,
    /// ACSF production date.
    pub acsf_date: String,
    /// Raw status tag.
    pub status: String,
    /// Free-text slice-quality comment.
    pub slice_quality: String,
    /// Health score, if one was recorded.
    pub health: Option<String>,
    /// Approach / pilot tag.
    pub pilot_name: String,
}

/// An attempt after exclusion, lookup, and parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAttempt {
    pub slice_name: String,
    pub prep_name: String,
    /// Operator login after the name-to-login remap.
    pub operator: String,
    pub rig: String,
    pub day: NaiveDate,
    /// Zero-padded `HH:MM`.
    pub time: String,
    /// `YYYY-MM-DD`, or empty when the form left it blank.
    pub acsf_date: String,
    pub status: AttemptStatus,
    pub slice_quality: String,
    pub health: Option<f64>,
}

impl NormalizedAttempt {
    /// Calendar day rendered as `YYYY-MM-DD`.
    pub fn day_str(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

/// Per-slice rollup. Serialized fields follow [`SLICE_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceSummary {
    pub day: String,
    pub slice_name: String,
    pub time: String,
    pub mean_health: Option<f64>,
    pub slice_success_rate: f64,
    pub slice_quality: String,
    pub attempt_count: usize,
    pub user: String,
    pub rig: String,
    pub acsf_date: String,
    #[serde(skip)]
    pub prep_name: String,
    #[serde(skip)]
    pub success_count: usize,
    #[serde(skip)]
    pub fail_count: usize,
}

/// Per-preparation rollup. Serialized fields follow [`PREP_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepSummary {
    pub day: String,
    pub prep_name: String,
    pub first_time: String,
    pub last_time: String,
    pub mean_health: Option<f64>,
    pub slice_success_rate: f64,
    pub wov_fraction: f64,
    pub uneven_fraction: f64,
    pub damaged_fraction: f64,
    pub attempt_count: usize,
    pub user: String,
    pub rig: String,
    pub acsf_date: String,
    pub slice_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(AttemptStatus::from("SUCCESS"), AttemptStatus::Success);
        assert_eq!(
            AttemptStatus::from("SUCCESS (high confidence)"),
            AttemptStatus::Success
        );
        assert_eq!(
            AttemptStatus::from("SUCCESS (low confidence)"),
            AttemptStatus::Success
        );
        assert_eq!(AttemptStatus::from("FAILURE"), AttemptStatus::Failure);
        assert_eq!(
            AttemptStatus::from("failure"),
            AttemptStatus::Other("failure".to_string())
        );
        assert_eq!(
            AttemptStatus::from("NO ATTEMPT"),
            AttemptStatus::Other("NO ATTEMPT".to_string())
        );
    }

    #[test]
    fn test_status_predicates() {
        assert!(AttemptStatus::Success.is_success());
        assert!(!AttemptStatus::Success.is_failure());
        assert!(AttemptStatus::Failure.is_failure());
        assert!(!AttemptStatus::Other("x".into()).is_success());
        assert!(!AttemptStatus::Other("x".into()).is_failure());
    }

    #[test]
    fn test_column_orders() {
        assert_eq!(SLICE_COLUMNS.len(), 10);
        assert_eq!(PREP_COLUMNS.len(), 14);
        // Issue fractions occupy sheet columns G:I.
        assert_eq!(PREP_COLUMNS[6], "wov_fraction");
        assert_eq!(PREP_COLUMNS[8], "damaged_fraction");
    }
}
