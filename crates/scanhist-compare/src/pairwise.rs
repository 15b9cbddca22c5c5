//! Two-scan comparison: each host and port falls into exactly one of
//! added, removed, changed, or unchanged.
//!
//! This is the N=2 case of the timeline model in [`crate::diff`], kept as a
//! lighter code path. [`ChangeKind::of_port`] and [`ChangeKind::of_host`] map
//! a two-slot timeline onto the same classification.

use std::collections::{BTreeSet, HashMap};

use scanhist_core::{Observation, PortObservation, Protocol, Scan};
use serde::{Deserialize, Serialize};

use crate::diff::compare_addresses;
use crate::loader::ScanData;
use crate::types::{HostDiff, PortDiff};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl ChangeKind {
    /// Classify a port from before/after observations.
    fn classify_port(before: Option<&PortObservation>, after: Option<&PortObservation>) -> Option<Self> {
        match (before, after) {
            (None, None) => None,
            (None, Some(_)) => Some(Self::Added),
            (Some(_), None) => Some(Self::Removed),
            (Some(a), Some(b)) if a.ttl != b.ttl || a.flags != b.flags => Some(Self::Changed),
            (Some(_), Some(_)) => Some(Self::Unchanged),
        }
    }

    /// Classification of a port diff built from exactly two scans.
    pub fn of_port(diff: &PortDiff) -> Option<Self> {
        match diff.presence.as_slice() {
            [before, after] => Self::classify_port(before.payload.as_ref(), after.payload.as_ref()),
            _ => None,
        }
    }

    /// Classification of a host diff built from exactly two scans.
    pub fn of_host(diff: &HostDiff) -> Option<Self> {
        match diff.presence.as_slice() {
            [before, after] => match (before.is_present(), after.is_present()) {
                (false, false) => None,
                (false, true) => Some(Self::Added),
                (true, false) => Some(Self::Removed),
                (true, true) => {
                    let any_port_changed = diff
                        .port_diffs
                        .iter()
                        .any(|p| Self::of_port(p) != Some(Self::Unchanged));
                    Some(if any_port_changed {
                        Self::Changed
                    } else {
                        Self::Unchanged
                    })
                }
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortChange {
    pub port: u16,
    pub protocol: Protocol,
    pub kind: ChangeKind,
    pub before: Option<PortObservation>,
    pub after: Option<PortObservation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostChange {
    pub address: String,
    pub kind: ChangeKind,
    pub ports: Vec<PortChange>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairSummary {
    pub hosts_added: usize,
    pub hosts_removed: usize,
    pub hosts_changed: usize,
    pub hosts_unchanged: usize,
    pub ports_added: usize,
    pub ports_removed: usize,
    pub ports_changed: usize,
    pub ports_unchanged: usize,
}

impl PairSummary {
    fn count_host(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Added => self.hosts_added += 1,
            ChangeKind::Removed => self.hosts_removed += 1,
            ChangeKind::Changed => self.hosts_changed += 1,
            ChangeKind::Unchanged => self.hosts_unchanged += 1,
        }
    }

    fn count_port(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Added => self.ports_added += 1,
            ChangeKind::Removed => self.ports_removed += 1,
            ChangeKind::Changed => self.ports_changed += 1,
            ChangeKind::Unchanged => self.ports_unchanged += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairwiseComparison {
    pub before: Scan,
    pub after: Scan,
    pub hosts: Vec<HostChange>,
    pub summary: PairSummary,
}

/// Compare scan `before` against scan `after`.
///
/// Hosts absent from both never appear. Hosts present in both are emitted
/// even when unchanged.
pub fn compare_pair(before: &ScanData, after: &ScanData) -> PairwiseComparison {
    let addresses: BTreeSet<&str> = before
        .hosts
        .keys()
        .chain(after.hosts.keys())
        .map(String::as_str)
        .collect();

    let mut summary = PairSummary::default();
    let mut hosts: Vec<HostChange> = Vec::new();

    for address in addresses {
        let Some(host) = compare_host(address, before, after) else {
            continue;
        };
        summary.count_host(host.kind);
        for port in &host.ports {
            summary.count_port(port.kind);
        }
        hosts.push(host);
    }

    hosts.sort_by(|a, b| compare_addresses(&a.address, &b.address));

    PairwiseComparison {
        before: before.scan.clone(),
        after: after.scan.clone(),
        hosts,
        summary,
    }
}

fn compare_host(address: &str, before: &ScanData, after: &ScanData) -> Option<HostChange> {
    let old = port_map(before, address);
    let new = port_map(after, address);

    let keys: BTreeSet<(u16, Protocol)> = old.keys().chain(new.keys()).copied().collect();
    let ports: Vec<PortChange> = keys
        .into_iter()
        .filter_map(|key| {
            let a = old.get(&key).cloned();
            let b = new.get(&key).cloned();
            let kind = ChangeKind::classify_port(a.as_ref(), b.as_ref())?;
            Some(PortChange {
                port: key.0,
                protocol: key.1,
                kind,
                before: a,
                after: b,
            })
        })
        .collect();

    let kind = match (old.is_empty(), new.is_empty()) {
        (true, true) => return None,
        (true, false) => ChangeKind::Added,
        (false, true) => ChangeKind::Removed,
        (false, false) if ports.iter().any(|p| p.kind != ChangeKind::Unchanged) => ChangeKind::Changed,
        (false, false) => ChangeKind::Unchanged,
    };

    Some(HostChange {
        address: address.to_string(),
        kind,
        ports,
    })
}

/// Resolved observations for one host in one scan; the first row per key wins.
fn port_map(scan: &ScanData, address: &str) -> HashMap<(u16, Protocol), PortObservation> {
    let mut map = HashMap::new();
    for obs in scan.host_observations(address) {
        map.entry((obs.port, obs.protocol))
            .or_insert_with(|| resolve(scan, obs));
    }
    map
}

fn resolve(scan: &ScanData, obs: &Observation) -> PortObservation {
    PortObservation::from_observation(obs, scan.banner_for(obs.id).map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use scanhist_core::{ObservationId, ScanId};

    use crate::diff::compute_comparison;

    fn scan(id: i64, rows: &[(&str, u16, u8, u32)]) -> ScanData {
        let meta = Scan {
            id: ScanId(id),
            start_time: Utc.timestamp_opt(id * 1_000, 0).unwrap(),
            end_time: Utc.timestamp_opt(id * 1_000 + 60, 0).unwrap(),
            target: "172.16.0.0/24".to_string(),
            mode: "TCP SYN".to_string(),
        };
        let observations = rows
            .iter()
            .enumerate()
            .map(|(i, &(addr, port, ttl, flags))| Observation {
                id: ObservationId(id * 100 + i as i64),
                host_addr: addr.to_string(),
                hostname: None,
                port,
                protocol: Protocol::Tcp,
                ttl,
                flags,
                window_size: None,
                source_mac: None,
            })
            .collect();
        ScanData::from_parts(meta, observations, Vec::new(), Vec::new())
    }

    fn kind_of(cmp: &PairwiseComparison, addr: &str) -> ChangeKind {
        cmp.hosts.iter().find(|h| h.address == addr).unwrap().kind
    }

    #[test]
    fn classifies_hosts_and_ports() {
        let a = scan(
            1,
            &[
                ("172.16.0.1", 80, 64, 0x12),
                ("172.16.0.2", 22, 64, 0x12),
                ("172.16.0.3", 443, 64, 0x12),
                ("172.16.0.4", 25, 64, 0x12),
            ],
        );
        let b = scan(
            2,
            &[
                ("172.16.0.1", 80, 64, 0x12),
                ("172.16.0.3", 443, 128, 0x12),
                ("172.16.0.4", 25, 64, 0x14),
                ("172.16.0.5", 8080, 64, 0x12),
            ],
        );

        let cmp = compare_pair(&a, &b);
        assert_eq!(kind_of(&cmp, "172.16.0.1"), ChangeKind::Unchanged);
        assert_eq!(kind_of(&cmp, "172.16.0.2"), ChangeKind::Removed);
        assert_eq!(kind_of(&cmp, "172.16.0.3"), ChangeKind::Changed);
        assert_eq!(kind_of(&cmp, "172.16.0.4"), ChangeKind::Changed);
        assert_eq!(kind_of(&cmp, "172.16.0.5"), ChangeKind::Added);

        assert_eq!(cmp.summary.hosts_added, 1);
        assert_eq!(cmp.summary.hosts_removed, 1);
        assert_eq!(cmp.summary.hosts_changed, 2);
        assert_eq!(cmp.summary.hosts_unchanged, 1);
        assert_eq!(cmp.summary.ports_changed, 2);
    }

    #[test]
    fn port_added_on_existing_host_changes_host() {
        let a = scan(1, &[("172.16.0.1", 80, 64, 0x12)]);
        let b = scan(2, &[("172.16.0.1", 80, 64, 0x12), ("172.16.0.1", 443, 64, 0x12)]);

        let cmp = compare_pair(&a, &b);
        let host = &cmp.hosts[0];
        assert_eq!(host.kind, ChangeKind::Changed);
        let kinds: Vec<ChangeKind> = host.ports.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Unchanged, ChangeKind::Added]);
        assert!(host.ports[1].before.is_none());
    }

    #[test]
    fn agrees_with_timeline_model() {
        let a = scan(
            1,
            &[
                ("172.16.0.1", 80, 64, 0x12),
                ("172.16.0.2", 22, 64, 0x12),
                ("172.16.0.3", 443, 64, 0x12),
            ],
        );
        let b = scan(
            2,
            &[
                ("172.16.0.1", 80, 64, 0x12),
                ("172.16.0.3", 443, 64, 0x14),
                ("172.16.0.9", 53, 64, 0x12),
            ],
        );

        let pair = compare_pair(&a, &b);
        let timeline = compute_comparison(&[a, b]).unwrap();

        assert_eq!(pair.hosts.len(), timeline.host_diffs.len());
        for (change, diff) in pair.hosts.iter().zip(&timeline.host_diffs) {
            assert_eq!(change.address, diff.address);
            assert_eq!(Some(change.kind), ChangeKind::of_host(diff));
            for (pc, pd) in change.ports.iter().zip(&diff.port_diffs) {
                assert_eq!(Some(pc.kind), ChangeKind::of_port(pd));
            }
        }
    }

    #[test]
    fn of_host_requires_two_slot_timeline() {
        let timeline = compute_comparison(&[
            scan(1, &[("172.16.0.1", 80, 64, 0x12)]),
            scan(2, &[]),
            scan(3, &[("172.16.0.1", 80, 64, 0x12)]),
        ])
        .unwrap();
        assert_eq!(ChangeKind::of_host(&timeline.host_diffs[0]), None);
    }
}
