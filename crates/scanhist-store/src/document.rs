use scanhist_core::{BannerRecord, GeoRecord, Observation, Scan};
use serde::{Deserialize, Serialize};

/// Everything recorded for one scan, as a single serializable document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDocument {
    pub scan: Scan,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub banners: Vec<BannerRecord>,
    #[serde(default)]
    pub geo: Vec<GeoRecord>,
}

impl ScanDocument {
    pub fn new(scan: Scan) -> Self {
        Self {
            scan,
            observations: Vec::new(),
            banners: Vec::new(),
            geo: Vec::new(),
        }
    }
}
