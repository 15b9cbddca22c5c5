//! Error types for the scanhist-store crate.

use scanhist_core::BookmarkId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(BookmarkId),

    #[error("Bookmark must reference at least one scan")]
    EmptyBookmark,

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
