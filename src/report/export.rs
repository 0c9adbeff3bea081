//! Comma-separated export of the prep summary.

use super::save_atomically;
use crate::error::{ReportError, ReportResult};
use crate::models::{PrepSummary, PREP_COLUMNS};
use std::path::Path;
use tracing::info;

/// Write the prep table as CSV, columns in sheet order.
///
/// The header row is written even when there are no preps.
pub fn write_prep_csv(path: &Path, preps: &[PrepSummary]) -> ReportResult<()> {
    let bytes = render_prep_csv(preps)?;
    save_atomically(path, &bytes)?;
    info!("Wrote {} prep rows to {}", preps.len(), path.display());
    Ok(())
}

pub fn render_prep_csv(preps: &[PrepSummary]) -> ReportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if preps.is_empty() {
        writer.write_record(PREP_COLUMNS)?;
    }
    for prep in preps {
        writer.serialize(prep)?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}
