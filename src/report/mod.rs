//! Report output: the styled spreadsheet and the optional CSV export.
//!
//! Every file is rendered in memory first and then moved into place, so a
//! failed save never leaves a half-written report at the destination.

pub mod export;
pub mod generator;

use crate::error::{ReportError, ReportResult};
use crate::window::DateRange;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub use export::write_prep_csv;
pub use generator::write_workbook;

/// Windows `ERROR_SHARING_VIOLATION`: the file is open in another program.
const SHARING_VIOLATION: i32 = 32;

/// Destination paths for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub xlsx: PathBuf,
    pub csv: PathBuf,
}

/// Report file names for a window: `S_E_base.xlsx` and `S-E_base.csv`.
pub fn output_paths(dir: &Path, base_name: &str, range: &DateRange) -> ReportPaths {
    let (start, end) = range.label();
    ReportPaths {
        xlsx: dir.join(format!("{}_{}_{}.xlsx", start, end, base_name)),
        csv: dir.join(format!("{}-{}_{}.csv", start, end, base_name)),
    }
}

/// Write `bytes` to `path` through a temporary file in the same directory.
///
/// The temporary file is removed if anything fails before the final rename.
pub fn save_atomically(path: &Path, bytes: &[u8]) -> ReportResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| classify_io(path, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| classify_io(path, e))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    debug!("Staged {} bytes for {}", bytes.len(), path.display());

    tmp.persist(path).map_err(|e| classify_io(path, e.error))?;
    Ok(())
}

/// Map an I/O failure at the destination to a user-facing error.
pub fn classify_io(path: &Path, err: io::Error) -> ReportError {
    if err.kind() == io::ErrorKind::PermissionDenied
        || err.raw_os_error() == Some(SHARING_VIOLATION)
    {
        ReportError::OutputLocked {
            path: path.to_path_buf(),
        }
    } else {
        ReportError::Io(err)
    }
}
