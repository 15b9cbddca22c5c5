//! Scan loading: resolve ids to scans and fetch their observation sets.
//!
//! Every repository call for every requested scan is issued concurrently;
//! callers get nothing until all of them have resolved. Ids that do not
//! resolve are dropped without error. Repository failures are returned
//! as-is with no retry.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures_util::future::try_join_all;
use scanhist_core::{AsnInfo, BannerRecord, GeoRecord, Observation, ObservationId, Scan, ScanId};
use scanhist_store::{ScanDocument, ScanRepository};

use crate::error::Result;

/// One resolved scan with its observations grouped by host address.
#[derive(Debug, Clone)]
pub struct ScanData {
    pub scan: Scan,
    pub hosts: BTreeMap<String, Vec<Observation>>,
    pub banners: HashMap<ObservationId, String>,
    pub asn: HashMap<String, AsnInfo>,
}

impl ScanData {
    /// Group raw rows into the per-scan lookups the engine reads.
    ///
    /// Geo records without an ASN are skipped. If one scan recorded several
    /// ASN records for a host, the first one wins.
    pub fn from_parts(
        scan: Scan,
        observations: Vec<Observation>,
        banners: Vec<BannerRecord>,
        geo: Vec<GeoRecord>,
    ) -> Self {
        let mut hosts: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for obs in observations {
            hosts.entry(obs.host_addr.clone()).or_default().push(obs);
        }

        let banners = banners
            .into_iter()
            .map(|b| (b.observation_id, b.text))
            .collect();

        let mut asn = HashMap::new();
        for record in &geo {
            if let Some(info) = record.asn_info() {
                asn.entry(record.host_addr.clone()).or_insert(info);
            }
        }

        Self {
            scan,
            hosts,
            banners,
            asn,
        }
    }

    pub fn banner_for(&self, id: ObservationId) -> Option<&str> {
        self.banners.get(&id).map(String::as_str)
    }

    /// Observations recorded for `address`; empty if the host did not respond.
    pub fn host_observations(&self, address: &str) -> &[Observation] {
        self.hosts.get(address).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of hosts with at least one observation.
    pub fn host_count(&self) -> usize {
        self.hosts.values().filter(|obs| !obs.is_empty()).count()
    }
}

impl From<ScanDocument> for ScanData {
    fn from(doc: ScanDocument) -> Self {
        Self::from_parts(doc.scan, doc.observations, doc.banners, doc.geo)
    }
}

/// Resolve scan ids to scan records, oldest first.
///
/// Duplicates collapse and unknown ids are dropped.
pub async fn resolve_scans(repo: &dyn ScanRepository, ids: &[ScanId]) -> Result<Vec<Scan>> {
    let unique: BTreeSet<ScanId> = ids.iter().copied().collect();

    let lookups = unique.iter().map(|&id| repo.get_scan(id));
    let mut scans: Vec<Scan> = try_join_all(lookups).await?.into_iter().flatten().collect();

    let dropped = unique.len() - scans.len();
    if dropped > 0 {
        tracing::debug!(
            requested = unique.len(),
            resolved = scans.len(),
            dropped,
            "Dropped unresolvable scan ids"
        );
    }

    scans.sort_by(Scan::chronological_cmp);
    Ok(scans)
}

/// Fetch observations, banners and geo records for every scan concurrently.
///
/// The returned data keeps the order of `scans`.
pub async fn fetch_scan_data(repo: &dyn ScanRepository, scans: Vec<Scan>) -> Result<Vec<ScanData>> {
    let fetches = scans.into_iter().map(|scan| fetch_one(repo, scan));
    try_join_all(fetches).await
}

async fn fetch_one(repo: &dyn ScanRepository, scan: Scan) -> Result<ScanData> {
    let (observations, banners, geo) = tokio::try_join!(
        repo.observations(scan.id),
        repo.banners(scan.id),
        repo.geo_records(scan.id),
    )?;

    tracing::debug!(
        scan_id = %scan.id,
        observations = observations.len(),
        banners = banners.len(),
        geo_records = geo.len(),
        "Scan data fetched"
    );

    Ok(ScanData::from_parts(scan, observations, banners, geo))
}

/// Resolve and fetch in one step.
pub async fn load_scans(repo: &dyn ScanRepository, ids: &[ScanId]) -> Result<Vec<ScanData>> {
    let scans = resolve_scans(repo, ids).await?;
    fetch_scan_data(repo, scans).await
}
