//! Error types for the scanhist-compare crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Store error: {0}")]
    Store(#[from] scanhist_store::StoreError),

    #[error(
        "Insufficient data to compare: {resolved} of {requested} requested scans resolved, at least 2 required"
    )]
    InsufficientScans { requested: usize, resolved: usize },

    #[error("Comparison superseded by a newer request")]
    Superseded,

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CompareError>;
