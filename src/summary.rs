use crate::error::{ReportError, Result};
use crate::types::{Finding, ScanMetadata, ScanReport, UNKNOWN};
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

/// Counts and per-host breakdown derived from a report without touching it.
#[derive(Debug, Clone)]
pub struct Summary<'a> {
    pub scan_info: &'a ScanMetadata,
    pub host_count: usize,
    pub open_ports: Vec<&'a Finding>,
    pub service_count: usize,
    /// Every host, sorted by address string, with its open-port findings.
    pub hosts: BTreeMap<&'a str, Vec<&'a Finding>>,
}

impl<'a> Summary<'a> {
    pub fn new(report: &'a ScanReport) -> Self {
        let mut hosts: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
        for f in &report.findings {
            hosts.entry(f.host.as_str()).or_default();
        }

        let open_ports: Vec<&Finding> = report.findings.iter().filter(|f| f.is_open()).collect();
        for &f in &open_ports {
            if let Some(list) = hosts.get_mut(f.host.as_str()) {
                list.push(f);
            }
        }

        let service_count = open_ports
            .iter()
            .filter(|f| !f.service.is_empty())
            .map(|f| f.service.as_str())
            .collect::<HashSet<_>>()
            .len();

        Self {
            scan_info: &report.scan_info,
            host_count: hosts.len(),
            open_ports,
            service_count,
            hosts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        if self.is_empty() {
            writeln!(out, "No results found")?;
            return Ok(());
        }

        writeln!(out, "\n=== SCAN SUMMARY ===")?;
        match (
            self.scan_info.protocol.as_str(),
            self.scan_info.numservices.as_str(),
        ) {
            (UNKNOWN, _) => {}
            (protocol, UNKNOWN) => writeln!(out, "Scan: {}", protocol)?,
            (protocol, count) => writeln!(out, "Scan: {} ({} services)", protocol, count)?,
        }
        writeln!(out, "Hosts scanned: {}", self.host_count)?;
        writeln!(out, "Open ports found: {}", self.open_ports.len())?;
        writeln!(out, "Unique services: {}", self.service_count)?;

        writeln!(out, "\n=== HOSTS ===")?;
        for (host, ports) in &self.hosts {
            writeln!(out, "{}: {} open ports", host, ports.len())?;
            for f in ports {
                writeln!(out, "  {}", port_line(f))?;
            }
        }
        Ok(())
    }
}

/// `protocol/port: service (version)`; the version part is dropped when
/// empty and a missing service prints as `unknown`.
pub fn port_line(f: &Finding) -> String {
    let service = if f.service.is_empty() {
        UNKNOWN
    } else {
        f.service.as_str()
    };
    if f.version.is_empty() {
        format!("{}/{}: {}", f.protocol, f.port, service)
    } else {
        format!("{}/{}: {} ({})", f.protocol, f.port, service, f.version)
    }
}

/// Render the summary for `report` into `out` (normally stdout).
pub fn print_summary(report: &ScanReport, out: &mut impl Write) -> Result<()> {
    let summary = Summary::new(report);
    summary
        .render(out)
        .and_then(|_| out.flush())
        .map_err(|e| ReportError::write_failure("console summary", e))
}
