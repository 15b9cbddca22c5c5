//! Markdown report export.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::{timestamp, transitions, Transition, TransitionKind};
use crate::grouping::asn_groups;
use crate::types::MultiScanComparisonResult;

/// Timeline bullets printed per scan pair before the remainder is elided.
const MAX_TIMELINE_ENTRIES: usize = 50;

/// Render a comparison as a Markdown report.
pub fn to_markdown(result: &MultiScanComparisonResult, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Multi-Scan Comparison Report\n");
    let _ = writeln!(out, "- **Generated:** {}", timestamp(&generated_at));
    let _ = writeln!(out, "- **Scans compared:** {}", result.scans.len());
    if let (Some(first), Some(last)) = (result.first_scan(), result.last_scan()) {
        let _ = writeln!(
            out,
            "- **Period:** {} to {}",
            timestamp(&first.start_time),
            timestamp(&last.end_time)
        );
    }
    out.push('\n');

    write_scans(&mut out, result);
    write_summary(&mut out, result);
    if result.has_asn_data() {
        write_asn_distribution(&mut out, result);
    }
    write_timeline(&mut out, result);
    write_new_and_lost(&mut out, result);
    write_host_details(&mut out, result);

    out
}

fn write_scans(out: &mut String, result: &MultiScanComparisonResult) {
    let _ = writeln!(out, "## Scans\n");
    let _ = writeln!(out, "| # | Scan ID | Start | End | Target | Mode |");
    let _ = writeln!(out, "|---|---------|-------|-----|--------|------|");
    for (i, scan) in result.scans.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            i + 1,
            scan.id,
            timestamp(&scan.start_time),
            timestamp(&scan.end_time),
            cell(&scan.target),
            cell(&scan.mode)
        );
    }
    out.push('\n');
}

fn write_summary(out: &mut String, result: &MultiScanComparisonResult) {
    let s = &result.summary;
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    for (label, value) in [
        ("Total hosts", s.total_hosts),
        ("Hosts in all scans", s.hosts_in_all_scans),
        ("Hosts in some scans", s.hosts_in_some_scans),
        ("Hosts in one scan", s.hosts_in_one_scan),
        ("Total ports", s.total_ports),
        ("Ports in all scans", s.ports_in_all_scans),
        ("Ports in some scans", s.ports_in_some_scans),
        ("Ports in one scan", s.ports_in_one_scan),
        ("Ports with presence changes", s.ports_with_changes),
        ("Ports with TTL changes", s.ports_with_ttl_changes),
        ("Ports with banner changes", s.ports_with_banner_changes),
        ("Ports with banners", s.ports_with_banners),
    ] {
        let _ = writeln!(out, "| {label} | {value} |");
    }
    out.push('\n');
}

fn write_asn_distribution(out: &mut String, result: &MultiScanComparisonResult) {
    let _ = writeln!(out, "## ASN Distribution\n");
    let _ = writeln!(out, "| ASN | Organization | Hosts |");
    let _ = writeln!(out, "|-----|--------------|-------|");
    for group in asn_groups(&result.host_diffs) {
        let _ = writeln!(
            out,
            "| AS{} | {} | {} |",
            group.asn,
            cell(group.org.as_deref().unwrap_or("Unknown")),
            group.host_count
        );
    }
    out.push('\n');
}

fn write_timeline(out: &mut String, result: &MultiScanComparisonResult) {
    let _ = writeln!(out, "## Timeline of Changes\n");

    for (i, pair) in result.scans.windows(2).enumerate() {
        let _ = writeln!(
            out,
            "### Scan {} → Scan {} ({} → {})\n",
            pair[0].id,
            pair[1].id,
            pair[0].start_time.format("%Y-%m-%d %H:%M"),
            pair[1].start_time.format("%Y-%m-%d %H:%M")
        );

        let events = transitions(result, i);
        if events.is_empty() {
            let _ = writeln!(out, "No changes\n");
            continue;
        }
        for event in events.iter().take(MAX_TIMELINE_ENTRIES) {
            let _ = writeln!(out, "- {}", describe(event));
        }
        if events.len() > MAX_TIMELINE_ENTRIES {
            let _ = writeln!(
                out,
                "- …and {} more",
                events.len() - MAX_TIMELINE_ENTRIES
            );
        }
        out.push('\n');
    }
}

fn describe(event: &Transition) -> String {
    let subject = format!("`{}` {}/{}", event.address, event.port, event.protocol);
    match &event.kind {
        TransitionKind::Opened => format!("{subject} opened"),
        TransitionKind::Closed => format!("{subject} closed"),
        TransitionKind::TtlChanged { from, to } => format!("{subject} TTL {from} → {to}"),
        TransitionKind::BannerChanged { to: Some(_), .. } => format!("{subject} banner changed"),
        TransitionKind::BannerChanged { to: None, .. } => format!("{subject} banner removed"),
    }
}

fn write_new_and_lost(out: &mut String, result: &MultiScanComparisonResult) {
    let (Some(first), Some(last)) = (result.first_scan(), result.last_scan()) else {
        return;
    };

    let _ = writeln!(out, "## New Hosts\n");
    let new: Vec<_> = result
        .host_diffs
        .iter()
        .filter(|h| h.first_seen_scan_id != first.id)
        .collect();
    if new.is_empty() {
        let _ = writeln!(out, "None\n");
    } else {
        for host in new {
            let _ = writeln!(
                out,
                "- `{}` first seen in scan {}",
                host.address, host.first_seen_scan_id
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Lost Hosts\n");
    let lost: Vec<_> = result
        .host_diffs
        .iter()
        .filter(|h| h.last_seen_scan_id != last.id)
        .collect();
    if lost.is_empty() {
        let _ = writeln!(out, "None\n");
    } else {
        for host in lost {
            let _ = writeln!(
                out,
                "- `{}` last seen in scan {}",
                host.address, host.last_seen_scan_id
            );
        }
        out.push('\n');
    }
}

fn write_host_details(out: &mut String, result: &MultiScanComparisonResult) {
    let scan_count = result.scans.len();
    let _ = writeln!(out, "## Host Details\n");
    let _ = writeln!(
        out,
        "| Address | Hostname | CIDR | ASN | Seen | First | Last | Ports | Changed |"
    );
    let _ = writeln!(
        out,
        "|---------|----------|------|-----|------|-------|------|-------|---------|"
    );
    for host in &result.host_diffs {
        let asn = match (host.asn_number, host.asn_org.as_deref()) {
            (Some(n), Some(org)) => format!("AS{n} {org}"),
            (Some(n), None) => format!("AS{n}"),
            (None, _) => String::new(),
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {}/{} | {} | {} | {} | {} |",
            cell(&host.address),
            cell(host.hostname.as_deref().unwrap_or("")),
            cell(host.cidr_group.as_deref().unwrap_or("")),
            cell(&asn),
            host.present_count,
            scan_count,
            host.first_seen_scan_id,
            host.last_seen_scan_id,
            host.port_diffs.len(),
            if host.has_changed { "yes" } else { "no" }
        );
    }
}

/// Escape a value for use inside a table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}
