//! Error taxonomy for the report pipeline.
//!
//! Data-integrity errors abort the run: a report built on silently dropped
//! or defaulted attempts is worse than no report at all. Only the final
//! write gets a dedicated user-facing variant.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, normalizing, or saving report data.
#[derive(Debug, Error)]
pub enum ReportError {
    /// An attempt timestamp could not be parsed.
    #[error("slice {slice}: unparseable timestamp {value:?}")]
    InvalidTimestamp { slice: String, value: String },

    /// An ACSF production date could not be parsed.
    #[error("slice {slice}: unparseable ACSF production date {value:?}")]
    InvalidAcsfDate { slice: String, value: String },

    /// A health score was present but not numeric.
    #[error("slice {slice}: health score {value:?} is not a number")]
    InvalidHealthScore { slice: String, value: String },

    /// The records directory is missing or is not a directory.
    #[error("records directory {} is not a readable directory", path.display())]
    RecordsDirUnavailable { path: PathBuf },

    /// A record file could not be read.
    #[error("failed to read record {}: {source}", path.display())]
    RecordRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record file did not have the expected structure.
    #[error("malformed record {}: {reason}", path.display())]
    MalformedRecord { path: PathBuf, reason: String },

    /// The destination file is open in another program or not writable.
    #[error(
        "Unable to save {}. Make sure you don't already have a file with the same name opened.",
        path.display()
    )]
    OutputLocked { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Result alias for pipeline stages.
pub type ReportResult<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_locked_message_is_actionable() {
        let err = ReportError::OutputLocked {
            path: PathBuf::from("reports/a.xlsx"),
        };
        let msg = err.to_string();
        assert!(msg.contains("reports/a.xlsx"));
        assert!(msg.contains("already have a file with the same name opened"));
    }

    #[test]
    fn test_record_errors_name_the_path() {
        let err = ReportError::RecordsDirUnavailable {
            path: PathBuf::from("all-metadata-files"),
        };
        assert!(err.to_string().contains("all-metadata-files"));

        let err = ReportError::RecordRead {
            path: PathBuf::from("records/PS_a.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("records/PS_a.json"));
    }

    #[test]
    fn test_integrity_errors_name_the_slice() {
        let err = ReportError::InvalidHealthScore {
            slice: "S1".to_string(),
            value: "good".to_string(),
        };
        assert!(err.to_string().contains("S1"));
        assert!(err.to_string().contains("\"good\""));
    }
}
