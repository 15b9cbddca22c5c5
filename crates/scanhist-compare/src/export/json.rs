//! JSON export.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::timestamp;
use crate::error::Result;
use crate::grouping::{asn_groups, AsnGroup};
use crate::types::{ComparisonSummary, HostDiff, MultiScanComparisonResult};

/// Report format version, bumped when the document shape changes.
pub const FORMAT_VERSION: &str = "2.1";

#[derive(Serialize)]
struct Report<'a> {
    metadata: Metadata,
    scans: Vec<ScanEntry<'a>>,
    summary: &'a ComparisonSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    asn_groups: Vec<AsnGroup>,
    hosts: &'a [HostDiff],
}

#[derive(Serialize)]
struct Metadata {
    version: &'static str,
    generated_at: String,
    generator: String,
    scan_count: usize,
}

#[derive(Serialize)]
struct ScanEntry<'a> {
    id: i64,
    start_time: String,
    end_time: String,
    target: &'a str,
    mode: &'a str,
}

/// Render a comparison as a pretty-printed JSON document.
pub fn to_json(result: &MultiScanComparisonResult, generated_at: DateTime<Utc>) -> Result<String> {
    let report = Report {
        metadata: Metadata {
            version: FORMAT_VERSION,
            generated_at: timestamp(&generated_at),
            generator: format!("scanhist {}", env!("CARGO_PKG_VERSION")),
            scan_count: result.scans.len(),
        },
        scans: result
            .scans
            .iter()
            .map(|s| ScanEntry {
                id: s.id.0,
                start_time: timestamp(&s.start_time),
                end_time: timestamp(&s.end_time),
                target: &s.target,
                mode: &s.mode,
            })
            .collect(),
        summary: &result.summary,
        asn_groups: asn_groups(&result.host_diffs),
        hosts: &result.host_diffs,
    };

    Ok(serde_json::to_string_pretty(&report)?)
}
