//! Change detection across an ordered set of scans.
//!
//! Each host and each `(port, protocol)` of a host gets a presence timeline
//! with one slot per scan. Change flags are derived from that timeline.
//! Computation is pure: it reads only already-fetched [`ScanData`].

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;

use scanhist_core::{Observation, PortObservation, Protocol, ScanId};

use crate::grouping;
use crate::loader::ScanData;
use crate::summary::summarize;
use crate::types::{HostDiff, MultiScanComparisonResult, PortDiff, PresenceEntry};

/// Identity of a port across scans.
type PortKey = (u16, Protocol);

/// Compare two or more scans, oldest first.
///
/// Returns `None` when fewer than two scans are given: there is nothing to
/// compare and no partial result is produced.
pub fn compute_comparison(scans: &[ScanData]) -> Option<MultiScanComparisonResult> {
    if scans.len() < 2 {
        return None;
    }

    let host_diffs = diff_hosts(scans);
    let summary = summarize(&host_diffs, scans.len());

    Some(MultiScanComparisonResult {
        scans: scans.iter().map(|s| s.scan.clone()).collect(),
        host_diffs,
        summary,
    })
}

/// Host diffs for every address seen in any scan, sorted by address value.
pub fn diff_hosts(scans: &[ScanData]) -> Vec<HostDiff> {
    let addresses: BTreeSet<&str> = scans
        .iter()
        .flat_map(|s| s.hosts.keys().map(String::as_str))
        .collect();

    let mut diffs: Vec<HostDiff> = addresses
        .into_iter()
        .filter_map(|address| diff_host(address, scans))
        .collect();

    diffs.sort_by(|a, b| compare_addresses(&a.address, &b.address));
    diffs
}

/// Order dotted-quad addresses by their big-endian integer value.
///
/// Text that is not IPv4 sorts after every IPv4 address, by string.
pub fn compare_addresses(a: &str, b: &str) -> Ordering {
    match (a.parse::<Ipv4Addr>(), b.parse::<Ipv4Addr>()) {
        (Ok(x), Ok(y)) => u32::from(x).cmp(&u32::from(y)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn diff_host(address: &str, scans: &[ScanData]) -> Option<HostDiff> {
    let presence: Vec<PresenceEntry<usize>> = scans
        .iter()
        .map(|s| match s.host_observations(address) {
            [] => PresenceEntry::absent(s.scan.id),
            obs => PresenceEntry::present(s.scan.id, obs.len()),
        })
        .collect();

    // An address with only empty groups never responded.
    let timeline = TimelineStats::from_presence(&presence)?;
    let asn = grouping::resolve_asn(scans, address);

    Some(HostDiff {
        address: address.to_string(),
        hostname: latest_hostname(address, scans),
        presence,
        first_seen_scan_id: timeline.first_seen,
        last_seen_scan_id: timeline.last_seen,
        present_count: timeline.present_count,
        has_changed: timeline.has_changed,
        port_diffs: diff_ports(address, scans),
        asn_number: asn.map(|a| a.number),
        asn_org: asn.and_then(|a| a.org.clone()),
        cidr_group: grouping::cidr_group(address),
    })
}

/// Port diffs for one host, sorted by port then protocol.
fn diff_ports(address: &str, scans: &[ScanData]) -> Vec<PortDiff> {
    let per_scan: Vec<HashMap<PortKey, &Observation>> = scans
        .iter()
        .map(|s| index_ports(s.host_observations(address)))
        .collect();

    let keys: BTreeSet<PortKey> = per_scan.iter().flat_map(|m| m.keys().copied()).collect();

    keys.into_iter()
        .filter_map(|key| diff_port(key, scans, &per_scan))
        .collect()
}

/// Index a host's observations by port identity. The first row recorded for
/// a key wins if a scan holds duplicates.
fn index_ports(observations: &[Observation]) -> HashMap<PortKey, &Observation> {
    let mut index = HashMap::new();
    for obs in observations {
        index.entry((obs.port, obs.protocol)).or_insert(obs);
    }
    index
}

fn diff_port(
    key: PortKey,
    scans: &[ScanData],
    per_scan: &[HashMap<PortKey, &Observation>],
) -> Option<PortDiff> {
    let presence: Vec<PresenceEntry<PortObservation>> = scans
        .iter()
        .zip(per_scan)
        .map(|(scan, ports)| match ports.get(&key) {
            Some(obs) => {
                let banner = scan.banner_for(obs.id).map(String::from);
                PresenceEntry::present(scan.scan.id, PortObservation::from_observation(obs, banner))
            }
            None => PresenceEntry::absent(scan.scan.id),
        })
        .collect();

    let timeline = TimelineStats::from_presence(&presence)?;
    let ttl_history: Vec<u8> = presence
        .iter()
        .filter_map(|e| e.payload.as_ref().map(|obs| obs.ttl))
        .collect();

    Some(PortDiff {
        port: key.0,
        protocol: key.1,
        first_seen_scan_id: timeline.first_seen,
        last_seen_scan_id: timeline.last_seen,
        present_count: timeline.present_count,
        has_changed: timeline.has_changed,
        has_ttl_changed: ttl_history.windows(2).any(|w| w[0] != w[1]),
        has_banner_changed: banner_changed(&presence),
        has_banner: presence
            .iter()
            .any(|e| e.payload.as_ref().is_some_and(|obs| obs.banner.is_some())),
        ttl_history,
        presence,
    })
}

/// Walk present entries tracking the last banner seen.
///
/// A banner that differs from the previous one, or a banner that
/// disappears, counts as a change. The first banner ever seen does not.
fn banner_changed(presence: &[PresenceEntry<PortObservation>]) -> bool {
    let mut last: Option<&str> = None;

    for obs in presence.iter().filter_map(|e| e.payload.as_ref()) {
        match (obs.banner.as_deref(), last) {
            (Some(current), Some(previous)) if current != previous => return true,
            (None, Some(_)) => return true,
            _ => {}
        }
        if obs.banner.is_some() {
            last = obs.banner.as_deref();
        }
    }

    false
}

/// Most recent non-empty hostname recorded for the host.
fn latest_hostname(address: &str, scans: &[ScanData]) -> Option<String> {
    scans.iter().rev().find_map(|s| {
        s.host_observations(address)
            .iter()
            .filter_map(|obs| obs.hostname.as_deref())
            .find(|name| !name.is_empty())
            .map(String::from)
    })
}

/// Shape of a presence timeline, shared by hosts and ports.
struct TimelineStats {
    present_count: usize,
    first_seen: ScanId,
    last_seen: ScanId,
    has_changed: bool,
}

impl TimelineStats {
    /// `None` if no entry is present.
    fn from_presence<T>(presence: &[PresenceEntry<T>]) -> Option<Self> {
        let first_seen = presence.iter().find(|e| e.is_present())?.scan_id;
        let last_seen = presence.iter().rev().find(|e| e.is_present())?.scan_id;

        Some(Self {
            present_count: presence.iter().filter(|e| e.is_present()).count(),
            first_seen,
            last_seen,
            has_changed: presence.windows(2).any(|w| w[0].status != w[1].status),
        })
    }
}
