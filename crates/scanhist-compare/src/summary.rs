//! Reduce host and port diffs to scalar counts.

use crate::types::{ComparisonSummary, HostDiff};

/// How many of the compared scans an entity appeared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    All,
    One,
    Partial,
}

impl Coverage {
    /// `All` wins over `One`, so a single-scan timeline counts as `All`.
    pub fn of(present_count: usize, scan_count: usize) -> Self {
        if present_count == scan_count {
            Self::All
        } else if present_count == 1 {
            Self::One
        } else {
            Self::Partial
        }
    }
}

/// Single pass over every host and every port.
pub fn summarize(hosts: &[HostDiff], scan_count: usize) -> ComparisonSummary {
    let mut summary = ComparisonSummary {
        scan_count,
        total_hosts: hosts.len(),
        ..Default::default()
    };

    for host in hosts {
        match Coverage::of(host.present_count, scan_count) {
            Coverage::All => summary.hosts_in_all_scans += 1,
            Coverage::One => summary.hosts_in_one_scan += 1,
            Coverage::Partial => summary.hosts_in_some_scans += 1,
        }

        for port in &host.port_diffs {
            summary.total_ports += 1;
            match Coverage::of(port.present_count, scan_count) {
                Coverage::All => summary.ports_in_all_scans += 1,
                Coverage::One => summary.ports_in_one_scan += 1,
                Coverage::Partial => summary.ports_in_some_scans += 1,
            }
            if port.has_changed {
                summary.ports_with_changes += 1;
            }
            if port.has_ttl_changed {
                summary.ports_with_ttl_changes += 1;
            }
            if port.has_banner_changed {
                summary.ports_with_banner_changes += 1;
            }
            if port.has_banner {
                summary.ports_with_banners += 1;
            }
        }
    }

    summary
}
