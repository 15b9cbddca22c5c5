//! File-backed scan repository.
//!
//! Each scan lives in its own JSON document:
//! ```text
//! {root}/
//!   1.json
//!   2.json
//!   ...
//! ```
//! Documents are read with `tokio::fs` on every call, so concurrent fetches
//! for different scans never block one another.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use scanhist_core::{BannerRecord, GeoRecord, Observation, Scan, ScanId};

use crate::document::ScanDocument;
use crate::error::Result;
use crate::repository::ScanRepository;

pub struct FileScanRepository {
    root: PathBuf,
}

impl FileScanRepository {
    /// Create a repository rooted at the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn document_path(&self, id: ScanId) -> PathBuf {
        self.root.join(format!("{}.json", id.0))
    }

    /// Write a scan document, replacing any existing one with the same id.
    pub async fn save(&self, document: &ScanDocument) -> Result<()> {
        let path = self.document_path(document.scan.id);
        let json = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&path, json).await?;

        tracing::debug!(
            scan_id = %document.scan.id,
            path = %path.display(),
            "Scan document saved"
        );
        Ok(())
    }

    /// Load a document; a missing file means the scan does not exist.
    async fn load(&self, id: ScanId) -> Result<Option<ScanDocument>> {
        match tokio::fs::read(self.document_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ScanRepository for FileScanRepository {
    async fn get_scan(&self, id: ScanId) -> Result<Option<Scan>> {
        Ok(self.load(id).await?.map(|doc| doc.scan))
    }

    async fn observations(&self, id: ScanId) -> Result<Vec<Observation>> {
        Ok(self
            .load(id)
            .await?
            .map(|doc| doc.observations)
            .unwrap_or_default())
    }

    async fn banners(&self, id: ScanId) -> Result<Vec<BannerRecord>> {
        Ok(self
            .load(id)
            .await?
            .map(|doc| doc.banners)
            .unwrap_or_default())
    }

    async fn geo_records(&self, id: ScanId) -> Result<Vec<GeoRecord>> {
        Ok(self.load(id).await?.map(|doc| doc.geo).unwrap_or_default())
    }

    async fn list_scans(&self) -> Result<Vec<Scan>> {
        let mut scans = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            let doc: ScanDocument = serde_json::from_slice(&bytes)?;
            scans.push(doc.scan);
        }

        scans.sort_by(Scan::chronological_cmp);
        Ok(scans)
    }
}
