use std::path::PathBuf;

use crate::validate::Rejection;

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{source_label} failed after {rows_read} rows ({processed} accepted): {source}")]
    Failed {
        source_label: String,
        processed: usize,
        rows_read: usize,
        #[source]
        source: csv::Error,
    },
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid ingestion options: {0}")]
    InvalidOptions(String),
}

/// Why a single row was dropped. Never propagated past the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowSkip {
    #[error("row has no vessel identity")]
    MissingIdentity,
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("filtered out: {0}")]
    FilteredOut(Rejection),
}

impl From<Rejection> for RowSkip {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidCoordinates {
                latitude,
                longitude,
            } => RowSkip::InvalidCoordinates {
                latitude,
                longitude,
            },
            other => RowSkip::FilteredOut(other),
        }
    }
}
