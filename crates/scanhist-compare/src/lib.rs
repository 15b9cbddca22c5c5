//! scanhist-compare: multi-scan comparison engine.
//!
//! Loads two or more recorded scans through a [`scanhist_store::ScanRepository`],
//! builds per-host and per-port presence timelines, flags presence, TTL and
//! banner changes, and renders the result as text, JSON, CSV or Markdown.
//!
//! ```text
//! ids ─► loader ─► diff ─► summary ─► export
//!          ▲                   │
//!     ScanRepository     ComparisonCache
//! ```

pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod export;
pub mod grouping;
pub mod loader;
pub mod pairwise;
pub mod service;
pub mod summary;
pub mod types;

pub use config::{CompareConfig, OutputFormat};
pub use diff::compute_comparison;
pub use error::{CompareError, Result};
pub use loader::ScanData;
pub use pairwise::{compare_pair, ChangeKind, PairwiseComparison};
pub use service::{ComparisonOutcome, ComparisonService};
pub use types::{
    ComparisonSummary, HostDiff, MultiScanComparisonResult, PortDiff, PresenceEntry,
    PresenceStatus,
};
