//! Comparison orchestration: cache → resolve → fetch → diff.
//!
//! One service instance backs one caller (a dashboard session, a CLI run).
//! When a newer `compare` starts before an older one finishes, the older
//! one's result is dropped and it reports [`ComparisonOutcome::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scanhist_core::ScanId;
use scanhist_store::ScanRepository;

use crate::cache::{cache_key, ComparisonCache};
use crate::diff::compute_comparison;
use crate::error::{CompareError, Result};
use crate::loader::{self, ScanData};
use crate::pairwise::{compare_pair, PairwiseComparison};
use crate::types::MultiScanComparisonResult;

/// What a comparison request produced.
#[derive(Debug, Clone)]
pub enum ComparisonOutcome {
    Ready(Arc<MultiScanComparisonResult>),
    /// Fewer than two distinct scans resolved.
    InsufficientScans { requested: usize, resolved: usize },
    /// A newer request started while this one was in flight.
    Superseded,
}

impl ComparisonOutcome {
    pub fn into_result(self) -> Result<Arc<MultiScanComparisonResult>> {
        match self {
            Self::Ready(result) => Ok(result),
            Self::InsufficientScans {
                requested,
                resolved,
            } => Err(CompareError::InsufficientScans {
                requested,
                resolved,
            }),
            Self::Superseded => Err(CompareError::Superseded),
        }
    }
}

pub struct ComparisonService {
    repo: Arc<dyn ScanRepository>,
    cache: ComparisonCache,
    generation: AtomicU64,
}

impl ComparisonService {
    pub fn new(repo: Arc<dyn ScanRepository>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache: ComparisonCache::new(cache_ttl),
            generation: AtomicU64::new(0),
        }
    }

    pub fn repository(&self) -> &dyn ScanRepository {
        self.repo.as_ref()
    }

    pub fn cache(&self) -> &ComparisonCache {
        &self.cache
    }

    /// Compare the given scans. Duplicates and unknown ids are tolerated.
    pub async fn compare(&self, ids: &[ScanId]) -> Result<ComparisonOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let key = cache_key(ids);

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(scans = ?key, "Comparison served from cache");
            return Ok(ComparisonOutcome::Ready(hit));
        }

        let start = Instant::now();
        let loaded = self.load(&key).await;

        if self.is_superseded(generation) {
            tracing::info!(scans = ?key, generation, "Comparison superseded, result discarded");
            return Ok(ComparisonOutcome::Superseded);
        }

        let data = match loaded? {
            Loaded::Insufficient { resolved } => {
                tracing::info!(
                    requested = key.len(),
                    resolved,
                    "Not enough scans resolved to compare"
                );
                return Ok(ComparisonOutcome::InsufficientScans {
                    requested: key.len(),
                    resolved,
                });
            }
            Loaded::Ready(data) => data,
        };

        let Some(result) = compute_comparison(&data) else {
            return Ok(ComparisonOutcome::InsufficientScans {
                requested: key.len(),
                resolved: data.len(),
            });
        };
        let result = Arc::new(result);
        self.cache.insert(key, Arc::clone(&result));

        tracing::info!(
            scans = result.scans.len(),
            hosts = result.summary.total_hosts,
            ports = result.summary.total_ports,
            changed_ports = result.summary.ports_with_changes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Comparison complete"
        );

        Ok(ComparisonOutcome::Ready(result))
    }

    /// Two-scan comparison, oldest scan first regardless of argument order.
    pub async fn compare_pair(&self, a: ScanId, b: ScanId) -> Result<PairwiseComparison> {
        let key = cache_key(&[a, b]);
        match self.load(&key).await? {
            Loaded::Ready(data) => match data.as_slice() {
                [before, after] => Ok(compare_pair(before, after)),
                _ => Err(CompareError::InsufficientScans {
                    requested: key.len(),
                    resolved: data.len(),
                }),
            },
            Loaded::Insufficient { resolved } => Err(CompareError::InsufficientScans {
                requested: key.len(),
                resolved,
            }),
        }
    }

    /// Resolve ids, and fetch scan data only if at least two resolved.
    async fn load(&self, ids: &[ScanId]) -> Result<Loaded> {
        let scans = loader::resolve_scans(self.repository(), ids).await?;
        if scans.len() < 2 {
            return Ok(Loaded::Insufficient {
                resolved: scans.len(),
            });
        }
        let data = loader::fetch_scan_data(self.repository(), scans).await?;
        Ok(Loaded::Ready(data))
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

enum Loaded {
    Ready(Vec<ScanData>),
    Insufficient { resolved: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use scanhist_core::{Observation, ObservationId, Protocol, Scan};
    use scanhist_store::{MemoryScanRepository, ScanDocument};

    fn doc(id: i64, hosts: &[&str]) -> ScanDocument {
        let mut doc = ScanDocument::new(Scan {
            id: ScanId(id),
            start_time: Utc.timestamp_opt(id * 86_400, 0).unwrap(),
            end_time: Utc.timestamp_opt(id * 86_400 + 900, 0).unwrap(),
            target: "10.0.0.0/24".to_string(),
            mode: "TCP SYN".to_string(),
        });
        doc.observations = hosts
            .iter()
            .enumerate()
            .map(|(i, addr)| Observation {
                id: ObservationId(id * 1_000 + i as i64),
                host_addr: addr.to_string(),
                hostname: None,
                port: 443,
                protocol: Protocol::Tcp,
                ttl: 64,
                flags: 0x12,
                window_size: Some(65535),
                source_mac: None,
            })
            .collect();
        doc
    }

    fn repo() -> MemoryScanRepository {
        MemoryScanRepository::new()
            .with_document(doc(1, &["10.0.0.1", "10.0.0.2"]))
            .with_document(doc(2, &["10.0.0.2", "10.0.0.3"]))
            .with_document(doc(3, &["10.0.0.3"]))
            .with_document(doc(4, &["10.0.0.4"]))
    }

    #[tokio::test]
    async fn compare_returns_ready_result() {
        let service = ComparisonService::new(Arc::new(repo()), Duration::from_secs(30));

        let result = service
            .compare(&[ScanId(2), ScanId(1)])
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result.scans[0].id, ScanId(1));
        assert_eq!(result.summary.total_hosts, 3);
        assert_eq!(result.summary.hosts_in_all_scans, 1);
    }

    #[tokio::test]
    async fn insufficient_scans_is_not_an_error_outcome() {
        let service = ComparisonService::new(Arc::new(repo()), Duration::from_secs(30));

        let outcome = service
            .compare(&[ScanId(1), ScanId(1), ScanId(77)])
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ComparisonOutcome::InsufficientScans {
                requested: 2,
                resolved: 1
            }
        ));
        assert!(matches!(
            outcome.into_result(),
            Err(CompareError::InsufficientScans { .. })
        ));
    }

    #[tokio::test]
    async fn identical_requests_hit_the_cache() {
        let repo = Arc::new(repo());
        let service = ComparisonService::new(repo.clone(), Duration::from_secs(30));

        let first = service.compare(&[ScanId(1), ScanId(2)]).await.unwrap();
        let fetches = repo.fetch_count();
        let second = service.compare(&[ScanId(2), ScanId(1), ScanId(2)]).await.unwrap();

        assert_eq!(repo.fetch_count(), fetches);
        match (first, second) {
            (ComparisonOutcome::Ready(a), ComparisonOutcome::Ready(b)) => {
                assert!(Arc::ptr_eq(&a, &b))
            }
            other => panic!("expected two ready outcomes, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_ttl_recomputes() {
        let repo = Arc::new(repo());
        let service = ComparisonService::new(repo.clone(), Duration::ZERO);

        service.compare(&[ScanId(1), ScanId(2)]).await.unwrap();
        let fetches = repo.fetch_count();
        service.compare(&[ScanId(1), ScanId(2)]).await.unwrap();
        assert!(repo.fetch_count() > fetches);
    }

    #[tokio::test]
    async fn newer_request_supersedes_older() {
        let repo = repo().with_delay(ScanId(1), Duration::from_millis(200));
        let service = ComparisonService::new(Arc::new(repo), Duration::from_secs(30));

        let slow = service.compare(&[ScanId(1), ScanId(2)]);
        let fast = service.compare(&[ScanId(3), ScanId(4)]);
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(slow.unwrap(), ComparisonOutcome::Superseded));
        let fast = fast.unwrap().into_result().unwrap();
        assert_eq!(fast.scans.len(), 2);
        // The discarded result is not cached either.
        assert!(service.cache().get(&[ScanId(1), ScanId(2)]).is_none());
    }

    #[tokio::test]
    async fn repository_failure_fails_the_comparison() {
        let repo = Arc::new(repo());
        repo.set_failing(true);
        let service = ComparisonService::new(repo, Duration::from_secs(30));

        let result = service.compare(&[ScanId(1), ScanId(2)]).await;
        assert!(matches!(result, Err(CompareError::Store(_))));
    }

    #[tokio::test]
    async fn compare_pair_orders_chronologically() {
        let service = ComparisonService::new(Arc::new(repo()), Duration::from_secs(30));

        let pair = service.compare_pair(ScanId(2), ScanId(1)).await.unwrap();
        assert_eq!(pair.before.id, ScanId(1));
        assert_eq!(pair.after.id, ScanId(2));
        assert_eq!(pair.summary.hosts_added, 1);
        assert_eq!(pair.summary.hosts_removed, 1);
        assert_eq!(pair.summary.hosts_unchanged, 1);

        let same = service.compare_pair(ScanId(1), ScanId(1)).await;
        assert!(matches!(
            same,
            Err(CompareError::InsufficientScans { resolved: 1, .. })
        ));
    }
}
