//! Report rendering for comparison results.
//!
//! Every renderer takes the generation time explicitly so output is
//! reproducible in tests.

pub mod csv;
pub mod json;
pub mod markdown;
pub mod text;

use chrono::{DateTime, SecondsFormat, Utc};
use scanhist_core::Protocol;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::types::MultiScanComparisonResult;

pub use self::csv::to_csv;
pub use self::json::to_json;
pub use self::markdown::to_markdown;
pub use self::text::to_summary;

/// Render a result in the requested format.
pub fn render(
    result: &MultiScanComparisonResult,
    format: OutputFormat,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    match format {
        OutputFormat::Summary => Ok(to_summary(result)),
        OutputFormat::Json => to_json(result, generated_at),
        OutputFormat::Csv => to_csv(result, generated_at),
        OutputFormat::Markdown => Ok(to_markdown(result, generated_at)),
    }
}

/// RFC 3339 with second precision and a `Z` suffix.
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// What happened to one port between two adjacent scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    Opened,
    Closed,
    TtlChanged { from: u8, to: u8 },
    BannerChanged { from: String, to: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub address: String,
    pub port: u16,
    pub protocol: Protocol,
    pub kind: TransitionKind,
}

/// Port transitions between timeline slots `index` and `index + 1`, in host
/// then port order.
///
/// A banner transition needs a banner in the earlier slot: a banner showing
/// up for the first time is not reported.
pub fn transitions(result: &MultiScanComparisonResult, index: usize) -> Vec<Transition> {
    let mut events = Vec::new();

    for host in &result.host_diffs {
        for port in &host.port_diffs {
            let (Some(before), Some(after)) =
                (port.presence.get(index), port.presence.get(index + 1))
            else {
                continue;
            };

            let mut push = |kind| {
                events.push(Transition {
                    address: host.address.clone(),
                    port: port.port,
                    protocol: port.protocol,
                    kind,
                })
            };

            match (before.payload.as_ref(), after.payload.as_ref()) {
                (None, Some(_)) => push(TransitionKind::Opened),
                (Some(_), None) => push(TransitionKind::Closed),
                (Some(old), Some(new)) => {
                    if old.ttl != new.ttl {
                        push(TransitionKind::TtlChanged {
                            from: old.ttl,
                            to: new.ttl,
                        });
                    }
                    if let Some(previous) = old.banner.as_deref() {
                        if new.banner.as_deref() != Some(previous) {
                            push(TransitionKind::BannerChanged {
                                from: previous.to_string(),
                                to: new.banner.clone(),
                            });
                        }
                    }
                }
                (None, None) => {}
            }
        }
    }

    events
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use scanhist_core::{BannerRecord, GeoRecord, Observation, ObservationId, Protocol, Scan, ScanId};

    use crate::diff::compute_comparison;
    use crate::loader::ScanData;
    use crate::types::MultiScanComparisonResult;

    fn obs(id: i64, addr: &str, port: u16, ttl: u8) -> Observation {
        Observation {
            id: ObservationId(id),
            host_addr: addr.to_string(),
            hostname: None,
            port,
            protocol: Protocol::Tcp,
            ttl,
            flags: 0x12,
            window_size: Some(29200),
            source_mac: None,
        }
    }

    fn scan(id: i64) -> Scan {
        Scan {
            id: ScanId(id),
            start_time: Utc.with_ymd_and_hms(2024, 3, id as u32, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, id as u32, 9, 15, 0).unwrap(),
            target: "10.0.0.0/16".to_string(),
            mode: "TCP SYN".to_string(),
        }
    }

    /// Three scans:
    /// - 10.0.0.1 port 22 in all three, TTL 64 then 128, banner appears in
    ///   scan 2 and changes in scan 3; port 80 closes after scan 1.
    /// - 10.0.0.2 only in scan 1.
    /// - 192.168.1.5 new in scan 3, with ASN data and a `|` in its hostname.
    pub fn three_scans() -> MultiScanComparisonResult {
        let mut hostname = obs(301, "192.168.1.5", 443, 52);
        hostname.hostname = Some("edge|gw.example".to_string());

        let data = vec![
            ScanData::from_parts(
                scan(1),
                vec![
                    obs(101, "10.0.0.1", 22, 64),
                    obs(102, "10.0.0.1", 80, 64),
                    obs(103, "10.0.0.2", 22, 64),
                ],
                Vec::new(),
                Vec::new(),
            ),
            ScanData::from_parts(
                scan(2),
                vec![obs(201, "10.0.0.1", 22, 64)],
                vec![BannerRecord {
                    observation_id: ObservationId(201),
                    text: "SSH-2.0-OpenSSH_8.9".to_string(),
                }],
                Vec::new(),
            ),
            ScanData::from_parts(
                scan(3),
                vec![obs(202, "10.0.0.1", 22, 128), hostname],
                vec![BannerRecord {
                    observation_id: ObservationId(202),
                    text: "SSH-2.0-OpenSSH_9.6".to_string(),
                }],
                vec![GeoRecord {
                    host_addr: "192.168.1.5".to_string(),
                    asn: Some(64512),
                    as_org: Some("Example Transit".to_string()),
                    country_code: Some("NL".to_string()),
                }],
            ),
        ];

        compute_comparison(&data).expect("three scans compare")
    }

    pub fn generated_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }
}
