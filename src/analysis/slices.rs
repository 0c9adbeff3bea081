//! Per-slice rollup of normalized attempts.

use super::mean;
use crate::models::{NormalizedAttempt, SliceSummary};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Group attempts by slice and compute one [`SliceSummary`] per slice.
///
/// Output is sorted by `(day, slice_name)`.
pub fn summarize_slices(attempts: &[NormalizedAttempt]) -> Vec<SliceSummary> {
    let mut grouped: BTreeMap<&str, Vec<&NormalizedAttempt>> = BTreeMap::new();
    for attempt in attempts {
        grouped
            .entry(attempt.slice_name.as_str())
            .or_default()
            .push(attempt);
    }

    let mut slices: Vec<SliceSummary> = grouped
        .into_iter()
        .map(|(slice_name, group)| summarize_slice(slice_name, &group))
        .collect();

    slices.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then_with(|| a.slice_name.cmp(&b.slice_name))
    });

    debug!("Summarized {} attempts into {} slices", attempts.len(), slices.len());
    slices
}

fn summarize_slice(slice_name: &str, group: &[&NormalizedAttempt]) -> SliceSummary {
    let attempt_count = group.len();
    let success_count = group.iter().filter(|a| a.status.is_success()).count();
    let fail_count = group.iter().filter(|a| a.status.is_failure()).count();
    let health: Vec<f64> = group.iter().filter_map(|a| a.health).collect();

    for attempt in group {
        if !attempt.status.is_success() && !attempt.status.is_failure() {
            debug!(
                "Slice {}: status {:?} counts as an attempt only",
                slice_name,
                attempt.status.to_string()
            );
        }
    }

    let pick = |field: &str, values: Vec<String>| representative(slice_name, field, values);

    SliceSummary {
        day: pick("day", group.iter().map(|a| a.day_str()).collect()),
        slice_name: slice_name.to_string(),
        time: pick("time", group.iter().map(|a| a.time.clone()).collect()),
        mean_health: mean(&health),
        slice_success_rate: success_count as f64 / attempt_count as f64,
        slice_quality: pick(
            "slice_quality",
            group.iter().map(|a| a.slice_quality.clone()).collect(),
        ),
        attempt_count,
        user: pick("user", group.iter().map(|a| a.operator.clone()).collect()),
        rig: pick("rig", group.iter().map(|a| a.rig.clone()).collect()),
        acsf_date: pick("acsf_date", group.iter().map(|a| a.acsf_date.clone()).collect()),
        prep_name: pick("prep_name", group.iter().map(|a| a.prep_name.clone()).collect()),
        success_count,
        fail_count,
    }
}

/// The smallest non-blank value in sort order, or blank if every value is.
///
/// These fields should be constant within a slice. Blank entries are treated
/// as missing; disagreement between non-blank entries is logged.
fn representative(slice_name: &str, field: &str, values: Vec<String>) -> String {
    let distinct: BTreeSet<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
    if distinct.len() > 1 {
        warn!(
            "Slice {} has {} different values for {}: {:?}; using the first in sort order",
            slice_name,
            distinct.len(),
            field,
            distinct
        );
    }
    distinct.into_iter().next().unwrap_or_default()
}
