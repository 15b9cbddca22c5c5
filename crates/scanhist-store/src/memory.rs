//! In-memory scan repository for tests and fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scanhist_core::{BannerRecord, GeoRecord, Observation, Scan, ScanId};

use crate::document::ScanDocument;
use crate::error::{Result, StoreError};
use crate::repository::ScanRepository;

/// Holds scan documents in a map.
///
/// Counts every fetch, can simulate a failing backend, and can delay
/// reads for specific scans so tests can control completion order.
#[derive(Default)]
pub struct MemoryScanRepository {
    documents: HashMap<ScanId, ScanDocument>,
    delays: HashMap<ScanId, Duration>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl MemoryScanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: ScanDocument) -> Self {
        self.documents.insert(document.scan.id, document);
        self
    }

    /// Delay every read that touches `id`.
    pub fn with_delay(mut self, id: ScanId, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    /// Make every subsequent read fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of repository calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn fetch(&self, id: ScanId) -> Result<Option<&ScanDocument>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("read of scan {id} failed")));
        }
        Ok(self.documents.get(&id))
    }
}

#[async_trait]
impl ScanRepository for MemoryScanRepository {
    async fn get_scan(&self, id: ScanId) -> Result<Option<Scan>> {
        Ok(self.fetch(id).await?.map(|doc| doc.scan.clone()))
    }

    async fn observations(&self, id: ScanId) -> Result<Vec<Observation>> {
        Ok(self
            .fetch(id)
            .await?
            .map(|doc| doc.observations.clone())
            .unwrap_or_default())
    }

    async fn banners(&self, id: ScanId) -> Result<Vec<BannerRecord>> {
        Ok(self
            .fetch(id)
            .await?
            .map(|doc| doc.banners.clone())
            .unwrap_or_default())
    }

    async fn geo_records(&self, id: ScanId) -> Result<Vec<GeoRecord>> {
        Ok(self
            .fetch(id)
            .await?
            .map(|doc| doc.geo.clone())
            .unwrap_or_default())
    }

    async fn list_scans(&self) -> Result<Vec<Scan>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("scan listing failed".to_string()));
        }
        let mut scans: Vec<Scan> = self.documents.values().map(|d| d.scan.clone()).collect();
        scans.sort_by(Scan::chronological_cmp);
        Ok(scans)
    }
}
