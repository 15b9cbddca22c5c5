//! Core domain types for historical scan browsing.
//!
//! A scan is one probing run. Each response it recorded is an
//! [`Observation`]: one port on one host, with the TTL and flags seen on the
//! wire. Banners and geo/ASN data are stored beside the observations and
//! joined in by the compare crate.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// ── Identifiers ───────────────────────────────────────────────────

/// Identifier of a recorded scan (the storage layer's numeric key).
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct ScanId(pub i64);

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScanId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ScanId)
            .map_err(|_| CoreError::InvalidScanId(s.to_string()))
    }
}

impl ScanId {
    /// Parse a comma-separated id list such as `"3,1, 2"`.
    ///
    /// Empty segments are skipped; order and duplicates are kept as given.
    pub fn parse_list(s: &str) -> Result<Vec<ScanId>, CoreError> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

/// Identifier of a single observation row within a scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ObservationId(pub i64);

/// Identifier of a saved comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BookmarkId(pub Uuid);

impl BookmarkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookmarkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookmarkId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(BookmarkId)
            .map_err(|_| CoreError::InvalidBookmarkId(s.to_string()))
    }
}

// ── Scans ─────────────────────────────────────────────────────────

/// One recorded probing run. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scan {
    pub id: ScanId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Target descriptor, e.g. `10.0.0.0/24:1-1024`.
    pub target: String,
    /// Mode descriptor, e.g. `TCP SYN`.
    pub mode: String,
}

impl Scan {
    /// Chronological order: `start_time` ascending, ties broken by id.
    pub fn chronological_cmp(&self, other: &Scan) -> Ordering {
        self.start_time
            .cmp(&other.start_time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

// ── Observations ──────────────────────────────────────────────────

/// Transport protocol of an observed response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    /// Any other IP protocol, by number.
    Other(u8),
}

impl Protocol {
    /// Map an IP protocol number to a protocol.
    pub fn from_number(number: u8) -> Self {
        match number {
            6 => Self::Tcp,
            17 => Self::Udp,
            n => Self::Other(n),
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Self::Tcp => 6,
            Self::Udp => 17,
            Self::Other(n) => *n,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
            Self::Other(n) => write!(f, "proto-{n}"),
        }
    }
}

/// A raw observation row as the storage layer returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observation {
    pub id: ObservationId,
    pub host_addr: String,
    #[serde(default)]
    pub hostname: Option<String>,
    pub port: u16,
    pub protocol: Protocol,
    pub ttl: u8,
    pub flags: u32,
    #[serde(default)]
    pub window_size: Option<u32>,
    #[serde(default)]
    pub source_mac: Option<String>,
}

/// A single response recorded for a host in one scan, banner resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortObservation {
    pub port: u16,
    pub protocol: Protocol,
    pub ttl: u8,
    pub flags: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl PortObservation {
    pub fn from_observation(obs: &Observation, banner: Option<String>) -> Self {
        Self {
            port: obs.port,
            protocol: obs.protocol,
            ttl: obs.ttl,
            flags: obs.flags,
            window_size: obs.window_size,
            source_mac: obs.source_mac.clone(),
            banner,
        }
    }
}

/// Banner text captured for one observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BannerRecord {
    pub observation_id: ObservationId,
    pub text: String,
}

/// Geo/ASN enrichment recorded for a host in one scan.
///
/// Any field may be missing; providers disagree on coverage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoRecord {
    pub host_addr: String,
    #[serde(default)]
    pub asn: Option<u32>,
    #[serde(default)]
    pub as_org: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl GeoRecord {
    /// ASN view of this record; `None` when no ASN was recorded.
    pub fn asn_info(&self) -> Option<AsnInfo> {
        self.asn.map(|number| AsnInfo {
            number,
            org: self.as_org.clone(),
        })
    }
}

/// Autonomous system that owns an address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AsnInfo {
    pub number: u32,
    pub org: Option<String>,
}

// ── Bookmarks ─────────────────────────────────────────────────────

/// A saved comparison: a set of scans plus a free-text note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub scan_ids: Vec<ScanId>,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(scan_ids: Vec<ScanId>, note: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BookmarkId::new(),
            scan_ids,
            note: note.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scan(id: i64, start_secs: i64) -> Scan {
        Scan {
            id: ScanId(id),
            start_time: Utc.timestamp_opt(start_secs, 0).unwrap(),
            end_time: Utc.timestamp_opt(start_secs + 60, 0).unwrap(),
            target: "10.0.0.0/24".to_string(),
            mode: "TCP SYN".to_string(),
        }
    }

    #[test]
    fn scan_ids_parse_from_list() {
        let ids = ScanId::parse_list("3, 1,,2").unwrap();
        assert_eq!(ids, vec![ScanId(3), ScanId(1), ScanId(2)]);
        assert!(matches!(
            ScanId::parse_list("1,abc"),
            Err(CoreError::InvalidScanId(_))
        ));
    }

    #[test]
    fn scan_id_serializes_transparent() {
        assert_eq!(serde_json::to_string(&ScanId(42)).unwrap(), "42");
    }

    #[test]
    fn chronological_order_breaks_ties_by_id() {
        let mut scans = vec![scan(9, 200), scan(5, 100), scan(2, 200)];
        scans.sort_by(Scan::chronological_cmp);
        let ids: Vec<i64> = scans.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[test]
    fn protocol_numbers_and_display() {
        assert_eq!(Protocol::from_number(6), Protocol::Tcp);
        assert_eq!(Protocol::from_number(17), Protocol::Udp);
        assert_eq!(Protocol::from_number(132), Protocol::Other(132));
        assert_eq!(Protocol::Other(132).number(), 132);
        assert_eq!(Protocol::Udp.to_string(), "udp");
        assert_eq!(Protocol::Other(1).to_string(), "proto-1");
        assert_eq!(serde_json::to_string(&Protocol::Tcp).unwrap(), "\"tcp\"");
    }

    #[test]
    fn geo_record_without_asn_has_no_asn_info() {
        let rec = GeoRecord {
            host_addr: "10.0.0.1".to_string(),
            as_org: Some("Example Org".to_string()),
            ..Default::default()
        };
        assert!(rec.asn_info().is_none());

        let rec = GeoRecord {
            asn: Some(64500),
            ..rec
        };
        assert_eq!(rec.asn_info().unwrap().number, 64500);
    }

    #[test]
    fn bookmark_id_round_trips_through_display() {
        let bookmark = Bookmark::new(vec![ScanId(1), ScanId(2)], "weekly");
        let parsed: BookmarkId = bookmark.id.to_string().parse().unwrap();
        assert_eq!(parsed, bookmark.id);
        assert_eq!(bookmark.created_at, bookmark.updated_at);
        assert!("not-a-uuid".parse::<BookmarkId>().is_err());
    }
}
