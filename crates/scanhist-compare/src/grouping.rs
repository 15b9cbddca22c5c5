//! Host grouping for display: coarse CIDR labels and ASN resolution.
//!
//! The CIDR label is a UI grouping key, not a network calculation. It does
//! not look at the scanned target's real netmask.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use scanhist_core::AsnInfo;
use serde::{Deserialize, Serialize};

use crate::loader::ScanData;
use crate::types::HostDiff;

/// Display group for an address: `/16` inside 10.0.0.0/8, `/24` elsewhere.
///
/// Returns `None` for anything that is not a dotted-quad IPv4 address.
pub fn cidr_group(address: &str) -> Option<String> {
    let addr: Ipv4Addr = address.parse().ok()?;
    let prefix = if addr.octets()[0] == 10 { 16 } else { 24 };
    Ipv4Net::new(addr, prefix)
        .ok()
        .map(|net| net.trunc().to_string())
}

/// ASN for a host, preferring the most recent scan that recorded one.
///
/// `scans` must be in chronological order. Org strings are taken verbatim
/// from the winning record.
pub fn resolve_asn<'a>(scans: &'a [ScanData], address: &str) -> Option<&'a AsnInfo> {
    scans.iter().rev().find_map(|s| s.asn.get(address))
}

/// Hosts sharing an autonomous system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AsnGroup {
    pub asn: u32,
    pub org: Option<String>,
    pub host_count: usize,
    pub addresses: Vec<String>,
}

/// Group hosts by ASN, largest group first, ties by ASN number.
///
/// The org of a group is the first non-empty org among its hosts.
pub fn asn_groups(hosts: &[HostDiff]) -> Vec<AsnGroup> {
    let mut groups: BTreeMap<u32, AsnGroup> = BTreeMap::new();

    for host in hosts {
        let Some(asn) = host.asn_number else {
            continue;
        };
        let group = groups.entry(asn).or_insert_with(|| AsnGroup {
            asn,
            org: None,
            host_count: 0,
            addresses: Vec::new(),
        });
        if group.org.is_none() {
            group.org = host.asn_org.clone();
        }
        group.host_count += 1;
        group.addresses.push(host.address.clone());
    }

    let mut groups: Vec<AsnGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| b.host_count.cmp(&a.host_count).then(a.asn.cmp(&b.asn)));
    groups
}

/// Hosts sharing a CIDR display label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CidrGroup {
    pub label: String,
    pub addresses: Vec<String>,
}

/// Group hosts by CIDR label, in order of first appearance.
///
/// Hosts without a label are left out.
pub fn cidr_groups(hosts: &[HostDiff]) -> Vec<CidrGroup> {
    let mut groups: Vec<CidrGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for host in hosts {
        let Some(label) = host.cidr_group.as_deref() else {
            continue;
        };
        let slot = *index.entry(label).or_insert_with(|| {
            groups.push(CidrGroup {
                label: label.to_string(),
                addresses: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].addresses.push(host.address.clone());
    }

    groups
}
