//! scanhist-store: data access seams for scan comparison.
//!
//! The compare engine never talks to storage directly. It is handed a
//! [`ScanRepository`], so tests run against [`MemoryScanRepository`] and the
//! CLI against [`FileScanRepository`]. Saved comparisons go through the
//! [`BookmarkStore`] trait.

pub mod bookmark;
pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod repository;

pub use bookmark::{BookmarkStore, FileBookmarkStore};
pub use document::ScanDocument;
pub use error::{Result, StoreError};
pub use file::FileScanRepository;
pub use memory::MemoryScanRepository;
pub use repository::ScanRepository;
