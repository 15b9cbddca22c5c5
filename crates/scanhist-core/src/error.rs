use thiserror::Error;

/// Errors raised while building or parsing core domain values.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid scan id: {0:?}")]
    InvalidScanId(String),

    #[error("Invalid bookmark id: {0:?}")]
    InvalidBookmarkId(String),
}
