//! Normalization and the two-level slice/prep rollup.
//!
//! [`build_report`] is the pure core of the tool: flat attempt records in,
//! sorted slice and prep tables out, with no file system access.

pub mod normalizer;
pub mod preps;
pub mod slices;

use crate::config::FilterConfig;
use crate::error::ReportResult;
use crate::lookup::{PrepLookup, UserTable};
use crate::models::{AttemptRecord, PrepSummary, SliceSummary};
use crate::window::DateRange;
use tracing::info;

use normalizer::normalize;
use preps::summarize_preps;
use slices::summarize_slices;

/// Both aggregate tables, each already in sheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub preps: Vec<PrepSummary>,
    pub slices: Vec<SliceSummary>,
}

/// Run normalization and both rollups over one batch of records.
pub fn build_report(
    records: &[AttemptRecord],
    range: &DateRange,
    filter: &FilterConfig,
    preps: &dyn PrepLookup,
    users: &UserTable,
) -> ReportResult<Aggregates> {
    let attempts = normalize(records, range, filter, preps, users)?;
    let slices = summarize_slices(&attempts);
    let preps = summarize_preps(&slices);

    info!(
        "Aggregated {} attempts into {} slices and {} preps",
        attempts.len(),
        slices.len(),
        preps.len()
    );

    Ok(Aggregates { preps, slices })
}

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
