//! Short-lived memo table for comparison results.
//!
//! Keyed by the sorted, de-duplicated scan-id tuple. Recorded scans never
//! change, so entries are only ever invalidated by age.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use scanhist_core::ScanId;

use crate::types::MultiScanComparisonResult;

/// Canonical cache key for a requested id list.
pub fn cache_key(ids: &[ScanId]) -> Vec<ScanId> {
    let mut key = ids.to_vec();
    key.sort();
    key.dedup();
    key
}

struct CacheEntry {
    expires_at: Instant,
    result: Arc<MultiScanComparisonResult>,
}

pub struct ComparisonCache {
    ttl: Duration,
    entries: Mutex<HashMap<Vec<ScanId>, CacheEntry>>,
}

impl ComparisonCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &[ScanId]) -> Option<Arc<MultiScanComparisonResult>> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: Vec<ScanId>, result: Arc<MultiScanComparisonResult>) {
        self.insert_at(key, result, Instant::now());
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len_at(Instant::now())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &[ScanId], now: Instant) -> Option<Arc<MultiScanComparisonResult>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.expires_at > now);
        entries.get(key).map(|entry| Arc::clone(&entry.result))
    }

    fn insert_at(&self, key: Vec<ScanId>, result: Arc<MultiScanComparisonResult>, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                expires_at: now + self.ttl,
                result,
            },
        );
    }

    fn len_at(&self, now: Instant) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|e| e.expires_at > now).count()
    }
}
