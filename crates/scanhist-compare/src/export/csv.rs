//! CSV export: several tables in one file, separated by `#` comment lines.

use chrono::{DateTime, Utc};
use csv::{Writer, WriterBuilder};

use super::timestamp;
use crate::error::{CompareError, Result};
use crate::grouping::asn_groups;
use crate::types::{ComparisonSummary, MultiScanComparisonResult};

/// Render a comparison as sectioned CSV.
///
/// Sections: scan timeline, summary statistics, ASN distribution (only when
/// any host has ASN data), host summary, port detail.
pub fn to_csv(result: &MultiScanComparisonResult, generated_at: DateTime<Utc>) -> Result<String> {
    let mut out = String::new();

    comment(&mut out, "Multi-Scan Comparison Report");
    comment(&mut out, &format!("Generated: {}", timestamp(&generated_at)));
    comment(&mut out, &format!("Scans: {}", result.scans.len()));
    comment(&mut out, &format!("Hosts: {}", result.host_diffs.len()));

    section(&mut out, "Scan Timeline");
    let mut wtr = table();
    wtr.write_record(["scan_id", "start_time", "end_time", "target", "mode"])?;
    for scan in &result.scans {
        wtr.write_record([
            scan.id.to_string(),
            timestamp(&scan.start_time),
            timestamp(&scan.end_time),
            scan.target.clone(),
            scan.mode.clone(),
        ])?;
    }
    append(&mut out, wtr)?;

    section(&mut out, "Summary Statistics");
    let mut wtr = table();
    wtr.write_record(["metric", "value"])?;
    for (metric, value) in summary_rows(&result.summary) {
        wtr.write_record([metric.to_string(), value.to_string()])?;
    }
    append(&mut out, wtr)?;

    if result.has_asn_data() {
        section(&mut out, "ASN Distribution");
        let mut wtr = table();
        wtr.write_record(["asn", "org", "host_count"])?;
        for group in asn_groups(&result.host_diffs) {
            wtr.write_record([
                group.asn.to_string(),
                group.org.unwrap_or_default(),
                group.host_count.to_string(),
            ])?;
        }
        append(&mut out, wtr)?;
    }

    section(&mut out, "Host Summary");
    let mut wtr = table();
    wtr.write_record([
        "address",
        "hostname",
        "cidr_group",
        "asn",
        "asn_org",
        "present_count",
        "first_seen_scan",
        "last_seen_scan",
        "has_changed",
        "port_count",
    ])?;
    for host in &result.host_diffs {
        wtr.write_record([
            host.address.clone(),
            host.hostname.clone().unwrap_or_default(),
            host.cidr_group.clone().unwrap_or_default(),
            host.asn_number.map(|n| n.to_string()).unwrap_or_default(),
            host.asn_org.clone().unwrap_or_default(),
            host.present_count.to_string(),
            host.first_seen_scan_id.to_string(),
            host.last_seen_scan_id.to_string(),
            host.has_changed.to_string(),
            host.port_diffs.len().to_string(),
        ])?;
    }
    append(&mut out, wtr)?;

    section(&mut out, "Port Detail");
    let mut wtr = table();
    wtr.write_record([
        "address",
        "port",
        "protocol",
        "present_count",
        "presence",
        "has_changed",
        "has_ttl_changed",
        "ttl_history",
        "has_banner_changed",
        "latest_banner",
    ])?;
    for host in &result.host_diffs {
        for port in &host.port_diffs {
            let presence: Vec<String> = port
                .presence
                .iter()
                .filter(|e| e.is_present())
                .map(|e| e.scan_id.to_string())
                .collect();
            let ttl_history: Vec<String> = port
                .ttl_by_scan()
                .map(|(scan_id, ttl)| format!("{scan_id}:{ttl}"))
                .collect();

            wtr.write_record([
                host.address.clone(),
                port.port.to_string(),
                port.protocol.to_string(),
                port.present_count.to_string(),
                presence.join(";"),
                port.has_changed.to_string(),
                port.has_ttl_changed.to_string(),
                ttl_history.join(";"),
                port.has_banner_changed.to_string(),
                port.latest_banner().unwrap_or_default().to_string(),
            ])?;
        }
    }
    append(&mut out, wtr)?;

    Ok(out)
}

fn summary_rows(summary: &ComparisonSummary) -> [(&'static str, usize); 13] {
    [
        ("scan_count", summary.scan_count),
        ("total_hosts", summary.total_hosts),
        ("hosts_in_all_scans", summary.hosts_in_all_scans),
        ("hosts_in_some_scans", summary.hosts_in_some_scans),
        ("hosts_in_one_scan", summary.hosts_in_one_scan),
        ("total_ports", summary.total_ports),
        ("ports_in_all_scans", summary.ports_in_all_scans),
        ("ports_in_some_scans", summary.ports_in_some_scans),
        ("ports_in_one_scan", summary.ports_in_one_scan),
        ("ports_with_changes", summary.ports_with_changes),
        ("ports_with_ttl_changes", summary.ports_with_ttl_changes),
        ("ports_with_banner_changes", summary.ports_with_banner_changes),
        ("ports_with_banners", summary.ports_with_banners),
    ]
}

/// One writer per table; comment lines never pass through CSV quoting.
fn table() -> Writer<Vec<u8>> {
    WriterBuilder::new().flexible(true).from_writer(Vec::new())
}

fn append(out: &mut String, wtr: Writer<Vec<u8>>) -> Result<()> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| CompareError::Io(e.into_error()))?;
    let rows = String::from_utf8(bytes).map_err(|e| CompareError::Export(e.to_string()))?;
    out.push_str(&rows);
    Ok(())
}

fn comment(out: &mut String, text: &str) {
    out.push_str("# ");
    out.push_str(text);
    out.push('\n');
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    comment(out, title);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    fn render() -> String {
        to_csv(&fixtures::three_scans(), fixtures::generated_at()).unwrap()
    }

    /// Lines of the section following `# title`, up to the next blank line.
    fn section_lines<'a>(csv: &'a str, title: &str) -> Vec<&'a str> {
        csv.lines()
            .skip_while(|l| *l != format!("# {title}"))
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn header_comments_come_first() {
        let csv = render();
        let head: Vec<&str> = csv.lines().take(4).collect();
        assert_eq!(
            head,
            vec![
                "# Multi-Scan Comparison Report",
                "# Generated: 2024-03-10T12:00:00Z",
                "# Scans: 3",
                "# Hosts: 3",
            ]
        );
    }

    #[test]
    fn each_table_follows_a_blank_line_and_title() {
        let csv = render();
        let lines: Vec<&str> = csv.lines().collect();
        let titles: Vec<&str> = lines
            .windows(2)
            .filter(|w| w[0].is_empty())
            .map(|w| w[1])
            .collect();
        assert_eq!(
            titles,
            vec![
                "# Scan Timeline",
                "# Summary Statistics",
                "# ASN Distribution",
                "# Host Summary",
                "# Port Detail",
            ]
        );
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn scan_timeline_lists_scans_in_order() {
        let csv = render();
        let rows = section_lines(&csv, "Scan Timeline");
        assert_eq!(rows[0], "scan_id,start_time,end_time,target,mode");
        assert_eq!(
            rows[1],
            "1,2024-03-01T09:00:00Z,2024-03-01T09:15:00Z,10.0.0.0/16,TCP SYN"
        );
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn summary_and_asn_sections() {
        let csv = render();
        let summary = section_lines(&csv, "Summary Statistics");
        assert!(summary.contains(&"total_hosts,3"));
        assert!(summary.contains(&"total_ports,4"));
        assert!(summary.contains(&"ports_with_ttl_changes,1"));
        assert!(summary.contains(&"ports_with_banner_changes,1"));

        let asn = section_lines(&csv, "ASN Distribution");
        assert_eq!(asn, vec!["asn,org,host_count", "64512,Example Transit,1"]);
    }

    #[test]
    fn port_detail_joins_presence_and_ttls() {
        let csv = render();
        let rows = section_lines(&csv, "Port Detail");
        assert!(rows.contains(
            &"10.0.0.1,22,tcp,3,1;2;3,false,true,1:64;2:64;3:128,true,SSH-2.0-OpenSSH_9.6"
        ));
        assert!(rows.contains(&"10.0.0.1,80,tcp,1,1,true,false,1:64,false,"));
    }

    #[test]
    fn asn_section_omitted_without_asn_data() {
        let mut result = fixtures::three_scans();
        for host in &mut result.host_diffs {
            host.asn_number = None;
        }
        let csv = to_csv(&result, fixtures::generated_at()).unwrap();
        assert!(!csv.contains("# ASN Distribution"));
        assert!(csv.contains("# Host Summary"));
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        let mut result = fixtures::three_scans();
        result.host_diffs[0].hostname = Some("a,b".to_string());
        let csv = to_csv(&result, fixtures::generated_at()).unwrap();
        assert!(csv.contains("10.0.0.1,\"a,b\","));
    }
}
