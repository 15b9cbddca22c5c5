//! scanhist-core: Shared types and error handling for the scanhist workspace.
//!
//! This crate provides the foundational types used by the store and compare
//! crates:
//! - Scan records and the per-port observations recorded in them
//! - Geo/ASN records attached to observed hosts
//! - Saved comparison bookmarks
//! - Common error types

pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{
    AsnInfo, BannerRecord, Bookmark, BookmarkId, GeoRecord, Observation, ObservationId,
    PortObservation, Protocol, Scan, ScanId,
};
