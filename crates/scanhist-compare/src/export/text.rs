//! Plain-text overview for terminal output.

use std::fmt::Write;

use crate::grouping::cidr_groups;
use crate::types::{HostDiff, MultiScanComparisonResult};

/// Short terminal summary: counts, then changed hosts grouped by network.
pub fn to_summary(result: &MultiScanComparisonResult) -> String {
    let s = &result.summary;
    let mut out = String::new();

    let ids: Vec<String> = result.scans.iter().map(|scan| scan.id.to_string()).collect();
    let _ = writeln!(
        out,
        "Compared {} scans ({})",
        result.scans.len(),
        ids.join(", ")
    );
    let _ = writeln!(
        out,
        "Hosts: {} total, {} in all scans, {} in some, {} in one",
        s.total_hosts, s.hosts_in_all_scans, s.hosts_in_some_scans, s.hosts_in_one_scan
    );
    let _ = writeln!(
        out,
        "Ports: {} total, {} in all scans, {} in some, {} in one",
        s.total_ports, s.ports_in_all_scans, s.ports_in_some_scans, s.ports_in_one_scan
    );
    let _ = writeln!(
        out,
        "Changes: {} ports changed presence, {} TTL, {} banner",
        s.ports_with_changes, s.ports_with_ttl_changes, s.ports_with_banner_changes
    );

    let changed: Vec<HostDiff> = result
        .host_diffs
        .iter()
        .filter(|h| h.has_changed || h.port_diffs.iter().any(|p| p.has_changed))
        .cloned()
        .collect();
    if changed.is_empty() {
        let _ = writeln!(out, "\nNo host changes.");
        return out;
    }

    let _ = writeln!(out, "\nChanged hosts:");
    for group in cidr_groups(&changed) {
        let _ = writeln!(out, "  {}", group.label);
        for address in &group.addresses {
            if let Some(host) = changed.iter().find(|h| &h.address == address) {
                let _ = writeln!(out, "    {}", host_line(host, result.scans.len()));
            }
        }
    }
    let ungrouped: Vec<&HostDiff> = changed.iter().filter(|h| h.cidr_group.is_none()).collect();
    if !ungrouped.is_empty() {
        let _ = writeln!(out, "  other");
        for host in ungrouped {
            let _ = writeln!(out, "    {}", host_line(host, result.scans.len()));
        }
    }

    out
}

fn host_line(host: &HostDiff, scan_count: usize) -> String {
    let name = host
        .hostname
        .as_deref()
        .map(|n| format!(" ({n})"))
        .unwrap_or_default();
    let changed_ports: Vec<String> = host
        .port_diffs
        .iter()
        .filter(|p| p.has_changed)
        .map(|p| format!("{}/{}", p.port, p.protocol))
        .collect();
    let mut line = format!(
        "{}{} seen {}/{}",
        host.address, name, host.present_count, scan_count
    );
    if !changed_ports.is_empty() {
        let _ = write!(line, ", ports changed: {}", changed_ports.join(" "));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    #[test]
    fn summary_counts_and_groups() {
        let text = to_summary(&fixtures::three_scans());
        assert!(text.starts_with("Compared 3 scans (1, 2, 3)"));
        assert!(text.contains("Hosts: 3 total, 1 in all scans, 0 in some, 2 in one"));
        assert!(text.contains("  10.0.0.0/16\n"));
        assert!(text.contains("    10.0.0.1 seen 3/3, ports changed: 80/tcp"));
        assert!(text.contains("    10.0.0.2 seen 1/3, ports changed: 22/tcp"));
        assert!(text.contains("  192.168.1.0/24\n"));
    }

    #[test]
    fn stable_comparison_says_so() {
        let mut result = fixtures::three_scans();
        result.host_diffs.retain(|h| h.address == "10.0.0.1");
        for port in &mut result.host_diffs[0].port_diffs {
            port.has_changed = false;
        }
        let text = to_summary(&result);
        assert!(text.ends_with("No host changes.\n"));
    }
}
