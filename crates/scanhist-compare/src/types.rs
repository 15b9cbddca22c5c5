//! Result types produced by the comparison engine.
//!
//! Everything here is read-only output: exporters and views traverse it,
//! nothing mutates it after the engine returns.

use scanhist_core::{PortObservation, Protocol, Scan, ScanId};
use serde::{Deserialize, Serialize};

/// Whether an entity responded in a given scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Present,
    Absent,
}

/// One slot of a presence timeline. Timelines hold one entry per compared
/// scan, in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceEntry<T> {
    pub scan_id: ScanId,
    pub status: PresenceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> PresenceEntry<T> {
    pub fn present(scan_id: ScanId, payload: T) -> Self {
        Self {
            scan_id,
            status: PresenceStatus::Present,
            payload: Some(payload),
        }
    }

    pub fn absent(scan_id: ScanId) -> Self {
        Self {
            scan_id,
            status: PresenceStatus::Absent,
            payload: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.status == PresenceStatus::Present
    }
}

/// Per-host diff across all compared scans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostDiff {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Payload is the number of observations recorded for the host.
    pub presence: Vec<PresenceEntry<usize>>,
    pub first_seen_scan_id: ScanId,
    pub last_seen_scan_id: ScanId,
    pub present_count: usize,
    pub has_changed: bool,
    pub port_diffs: Vec<PortDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_group: Option<String>,
}

/// Per-port diff for one host, keyed by `(port, protocol)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortDiff {
    pub port: u16,
    pub protocol: Protocol,
    pub presence: Vec<PresenceEntry<PortObservation>>,
    pub first_seen_scan_id: ScanId,
    pub last_seen_scan_id: ScanId,
    pub present_count: usize,
    pub has_changed: bool,
    pub has_ttl_changed: bool,
    /// TTLs of the present entries, in timeline order.
    pub ttl_history: Vec<u8>,
    pub has_banner_changed: bool,
    pub has_banner: bool,
}

impl PortDiff {
    /// The most recent banner captured for this port, if any scan had one.
    pub fn latest_banner(&self) -> Option<&str> {
        self.presence
            .iter()
            .rev()
            .filter_map(|e| e.payload.as_ref())
            .find_map(|obs| obs.banner.as_deref())
    }

    /// `(scan_id, ttl)` for each present entry, in timeline order.
    pub fn ttl_by_scan(&self) -> impl Iterator<Item = (ScanId, u8)> + '_ {
        self.presence
            .iter()
            .filter_map(|e| e.payload.as_ref().map(|obs| (e.scan_id, obs.ttl)))
    }
}

/// Scalar counts derived from the host diffs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparisonSummary {
    pub scan_count: usize,
    pub total_hosts: usize,
    pub hosts_in_all_scans: usize,
    pub hosts_in_one_scan: usize,
    pub hosts_in_some_scans: usize,
    pub total_ports: usize,
    pub ports_in_all_scans: usize,
    pub ports_in_one_scan: usize,
    pub ports_in_some_scans: usize,
    pub ports_with_changes: usize,
    pub ports_with_ttl_changes: usize,
    pub ports_with_banner_changes: usize,
    pub ports_with_banners: usize,
}

/// Complete output of a multi-scan comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultiScanComparisonResult {
    /// Compared scans, oldest first.
    pub scans: Vec<Scan>,
    pub host_diffs: Vec<HostDiff>,
    pub summary: ComparisonSummary,
}

impl MultiScanComparisonResult {
    pub fn first_scan(&self) -> Option<&Scan> {
        self.scans.first()
    }

    pub fn last_scan(&self) -> Option<&Scan> {
        self.scans.last()
    }

    pub fn has_asn_data(&self) -> bool {
        self.host_diffs.iter().any(|h| h.asn_number.is_some())
    }
}
