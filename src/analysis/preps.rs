//! Per-preparation rollup of slice summaries.
//!
//! This is a two-level rollup: the prep success rate is the mean of its
//! slices' success rates, not a pooled rate over every attempt.

use super::mean;
use crate::models::{PrepSummary, SliceSummary};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Slice-quality tags counted per prep, in sheet column order.
pub const ISSUE_TAGS: [&str; 3] = ["Wave of Death", "Uneven Thickness", "Damaged"];

/// Group slices by prep name and compute one [`PrepSummary`] per prep.
///
/// Output is sorted by `(day, first_time, prep_name)`.
pub fn summarize_preps(slices: &[SliceSummary]) -> Vec<PrepSummary> {
    let mut grouped: BTreeMap<&str, Vec<&SliceSummary>> = BTreeMap::new();
    for slice in slices {
        grouped
            .entry(slice.prep_name.as_str())
            .or_default()
            .push(slice);
    }

    let mut preps: Vec<PrepSummary> = grouped
        .into_iter()
        .map(|(prep_name, group)| summarize_prep(prep_name, &group))
        .collect();

    preps.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then_with(|| a.first_time.cmp(&b.first_time))
            .then_with(|| a.prep_name.cmp(&b.prep_name))
    });

    debug!("Summarized {} slices into {} preps", slices.len(), preps.len());
    preps
}

fn summarize_prep(prep_name: &str, group: &[&SliceSummary]) -> PrepSummary {
    let rates: Vec<f64> = group.iter().map(|s| s.slice_success_rate).collect();
    let health: Vec<f64> = group.iter().filter_map(|s| s.mean_health).collect();
    let comments: Vec<&str> = group.iter().map(|s| s.slice_quality.as_str()).collect();
    let [wov_fraction, uneven_fraction, damaged_fraction] = issue_fractions(&comments, group.len());

    // Zero-padded HH:MM sorts chronologically.
    let times: BTreeSet<&str> = group.iter().map(|s| s.time.as_str()).collect();

    PrepSummary {
        day: joined(group.iter().map(|s| s.day.as_str())),
        prep_name: prep_name.to_string(),
        first_time: times.first().map(|t| t.to_string()).unwrap_or_default(),
        last_time: times.last().map(|t| t.to_string()).unwrap_or_default(),
        mean_health: mean(&health),
        slice_success_rate: mean(&rates).unwrap_or(0.0),
        wov_fraction,
        uneven_fraction,
        damaged_fraction,
        attempt_count: group.iter().map(|s| s.attempt_count).sum(),
        user: joined(group.iter().map(|s| s.user.as_str())),
        rig: joined(group.iter().map(|s| s.rig.as_str())),
        acsf_date: joined(group.iter().map(|s| s.acsf_date.as_str())),
        slice_name: joined(group.iter().map(|s| s.slice_name.as_str())),
    }
}

/// Fraction of slices whose comment contains each of [`ISSUE_TAGS`].
///
/// Matching is a case-sensitive substring search and one comment may count
/// toward several tags.
pub fn issue_fractions(comments: &[&str], slice_count: usize) -> [f64; 3] {
    if slice_count == 0 {
        return [0.0; 3];
    }

    ISSUE_TAGS.map(|tag| {
        let hits = comments.iter().filter(|c| c.contains(tag)).count();
        hits as f64 / slice_count as f64
    })
}

/// Distinct non-blank values in sort order, joined with `", "`.
fn joined<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(name: &str, prep: &str, rate: f64, attempts: usize, quality: &str) -> SliceSummary {
        SliceSummary {
            day: "2024-01-09".to_string(),
            slice_name: name.to_string(),
            time: "10:15".to_string(),
            mean_health: Some(3.0),
            slice_success_rate: rate,
            slice_quality: quality.to_string(),
            attempt_count: attempts,
            user: "janed".to_string(),
            rig: "4".to_string(),
            acsf_date: "2024-01-05".to_string(),
            prep_name: prep.to_string(),
            success_count: 0,
            fail_count: 0,
        }
    }

    #[test]
    fn test_single_slice_with_wave_of_death() {
        let preps = summarize_preps(&[slice("S1", "P1", 2.0 / 3.0, 3, "Wave of Death present")]);
        assert_eq!(preps.len(), 1);
        let p1 = &preps[0];
        assert_eq!(p1.wov_fraction, 1.0);
        assert_eq!(p1.uneven_fraction, 0.0);
        assert_eq!(p1.damaged_fraction, 0.0);
        assert_eq!(p1.attempt_count, 3);
        assert_eq!(p1.slice_name, "S1");
    }

    #[test]
    fn test_mean_of_means_not_pooled() {
        // 1/1 and 1/3: pooled would be 2/4 = 0.5, mean of rates is 2/3.
        let preps = summarize_preps(&[
            slice("S1", "P1", 1.0, 1, ""),
            slice("S2", "P1", 1.0 / 3.0, 3, ""),
        ]);
        assert!((preps[0].slice_success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(preps[0].attempt_count, 4);
    }

    #[test]
    fn test_no_cross_prep_leakage() {
        let preps = summarize_preps(&[
            slice("S1", "P1", 1.0, 2, "Damaged"),
            slice("S2", "P2", 0.5, 2, ""),
        ]);
        assert_eq!(preps.len(), 2);
        let p1 = preps.iter().find(|p| p.prep_name == "P1").unwrap();
        let p2 = preps.iter().find(|p| p.prep_name == "P2").unwrap();
        assert_eq!(p1.slice_success_rate, 1.0);
        assert_eq!(p2.slice_success_rate, 0.5);
        assert_eq!(p1.damaged_fraction, 1.0);
        assert_eq!(p2.damaged_fraction, 0.0);
        assert_eq!(p1.slice_name, "S1");
        assert_eq!(p2.slice_name, "S2");
    }

    #[test]
    fn test_issue_fractions_overlap() {
        let preps = summarize_preps(&[
            slice("S1", "P1", 1.0, 1, "Uneven Thickness, Damaged"),
            slice("S2", "P1", 1.0, 1, "damaged"),
            slice("S3", "P1", 1.0, 1, ""),
            slice("S4", "P1", 1.0, 1, "Wave of Death"),
        ]);
        let p1 = &preps[0];
        assert_eq!(p1.wov_fraction, 0.25);
        assert_eq!(p1.uneven_fraction, 0.25);
        // Case-sensitive: "damaged" does not count.
        assert_eq!(p1.damaged_fraction, 0.25);
    }

    #[test]
    fn test_issue_fractions_bounds() {
        assert_eq!(issue_fractions(&[], 0), [0.0, 0.0, 0.0]);
        assert_eq!(issue_fractions(&["", "fine"], 2), [0.0, 0.0, 0.0]);
        let all = issue_fractions(&["Wave of Death, Uneven Thickness, Damaged"], 1);
        assert_eq!(all, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_times_and_joined_sets() {
        let mut a = slice("S2", "P1", 1.0, 1, "");
        a.time = "09:05".to_string();
        a.user = "samr".to_string();
        let mut b = slice("S1", "P1", 1.0, 1, "");
        b.time = "14:30".to_string();
        b.day = "2024-01-10".to_string();
        let mut c = slice("S3", "P1", 1.0, 1, "");
        c.time = "10:00".to_string();
        c.acsf_date = String::new();

        let p1 = &summarize_preps(&[a, b, c])[0];
        assert_eq!(p1.first_time, "09:05");
        assert_eq!(p1.last_time, "14:30");
        assert_eq!(p1.day, "2024-01-09, 2024-01-10");
        assert_eq!(p1.user, "janed, samr");
        assert_eq!(p1.rig, "4");
        assert_eq!(p1.acsf_date, "2024-01-05");
        assert_eq!(p1.slice_name, "S1, S2, S3");
    }

    #[test]
    fn test_mean_health_of_slice_means() {
        let mut a = slice("S1", "P1", 1.0, 1, "");
        a.mean_health = Some(2.0);
        let mut b = slice("S2", "P1", 1.0, 1, "");
        b.mean_health = None;
        let mut c = slice("S3", "P1", 1.0, 1, "");
        c.mean_health = Some(5.0);
        assert_eq!(summarize_preps(&[a, b, c])[0].mean_health, Some(3.5));
    }

    #[test]
    fn test_sorted_by_day_then_first_time() {
        let mut late = slice("S1", "A", 1.0, 1, "");
        late.time = "15:00".to_string();
        let mut early = slice("S2", "B", 1.0, 1, "");
        early.time = "08:00".to_string();
        let mut next_day = slice("S3", "C", 1.0, 1, "");
        next_day.day = "2024-01-10".to_string();
        next_day.time = "07:00".to_string();

        let order: Vec<_> = summarize_preps(&[next_day, late, early])
            .into_iter()
            .map(|p| p.prep_name)
            .collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_attempt_count_is_exact_sum() {
        let slices = vec![
            slice("S1", "P1", 1.0, 7, ""),
            slice("S2", "P1", 0.0, 5, ""),
            slice("S3", "P2", 0.5, 2, ""),
        ];
        for prep in summarize_preps(&slices) {
            let expected: usize = slices
                .iter()
                .filter(|s| s.prep_name == prep.prep_name)
                .map(|s| s.attempt_count)
                .sum();
            assert_eq!(prep.attempt_count, expected);
        }
    }
}
