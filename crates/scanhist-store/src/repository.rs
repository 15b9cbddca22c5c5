//! The scan data source consumed by the comparison loader.

use async_trait::async_trait;
use scanhist_core::{BannerRecord, GeoRecord, Observation, Scan, ScanId};

use crate::error::Result;

/// Read access to recorded scans.
///
/// Every method takes a single scan id so callers can fan requests out
/// concurrently. Implementations must be safe to share across tasks.
#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Scan metadata, or `None` if no scan has this id.
    async fn get_scan(&self, id: ScanId) -> Result<Option<Scan>>;

    /// All observation rows recorded by the scan.
    async fn observations(&self, id: ScanId) -> Result<Vec<Observation>>;

    /// Banner text captured during the scan, keyed by observation.
    async fn banners(&self, id: ScanId) -> Result<Vec<BannerRecord>>;

    /// Geo/ASN records for hosts seen in the scan.
    async fn geo_records(&self, id: ScanId) -> Result<Vec<GeoRecord>>;

    /// Every stored scan in chronological order.
    async fn list_scans(&self) -> Result<Vec<Scan>>;
}
