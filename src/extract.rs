use crate::loader::{Element, ScanTree};
use crate::types::{Finding, ScanMetadata, ScanReport, ScriptResult, UNKNOWN};
use ::time::{format_description::well_known, OffsetDateTime};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters collected during one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub hosts_seen: u64,
    pub hosts_without_ports: u64,
    pub ports_skipped: u64,
}

/// Walk the parsed document and build one [`Finding`] per port.
///
/// - Hosts without a `<ports>` element contribute nothing.
/// - A `<port>` missing `portid` or `protocol` is skipped and logged.
/// - Output order is host document order, then port document order.
pub fn extract(tree: &ScanTree) -> ScanReport {
    extract_with_stats(tree).0
}

pub fn extract_with_stats(tree: &ScanTree) -> (ScanReport, ExtractStats) {
    let root = &tree.root;
    let scan_info = Arc::new(read_metadata(root));
    let mut stats = ExtractStats::default();
    let mut findings = Vec::new();

    for host in root.children_named("host") {
        stats.hosts_seen += 1;

        let addr = host
            .child("address")
            .and_then(|a| a.attr("addr"))
            .unwrap_or(UNKNOWN);
        let hostname = host
            .child("hostnames")
            .and_then(|h| h.child("hostname"))
            .and_then(|h| h.attr("name"))
            .unwrap_or(UNKNOWN);
        let host_status = host
            .child("status")
            .and_then(|s| s.attr("state"))
            .unwrap_or(UNKNOWN);

        let Some(ports) = host.child("ports") else {
            debug!("Host {} has no ports element, skipping", addr);
            stats.hosts_without_ports += 1;
            continue;
        };

        for port in ports.children_named("port") {
            let (Some(portid), Some(protocol)) = (port.attr("portid"), port.attr("protocol"))
            else {
                warn!(
                    "Skipping port without portid/protocol on host {} ({:?})",
                    addr, port.attributes
                );
                stats.ports_skipped += 1;
                continue;
            };

            let state = port
                .child("state")
                .and_then(|s| s.attr("state"))
                .unwrap_or(UNKNOWN);
            let service = port.child("service");
            let svc = |key: &str| {
                service
                    .and_then(|s| s.attr(key))
                    .unwrap_or_default()
                    .to_string()
            };

            findings.push(Finding {
                timestamp: now_iso_like(),
                host: addr.to_string(),
                hostname: hostname.to_string(),
                host_status: host_status.to_string(),
                protocol: protocol.to_string(),
                port: portid.to_string(),
                state: state.to_string(),
                service: svc("name"),
                version: svc("version"),
                product: svc("product"),
                extrainfo: svc("extrainfo"),
                scripts: port.children_named("script").map(read_script).collect(),
                scan_info: Arc::clone(&scan_info),
            });
        }
    }

    info!(
        "Extracted {} findings from {} hosts ({} without ports, {} ports skipped)",
        findings.len(),
        stats.hosts_seen,
        stats.hosts_without_ports,
        stats.ports_skipped
    );

    (
        ScanReport {
            scan_info,
            findings,
        },
        stats,
    )
}

fn read_metadata(root: &Element) -> ScanMetadata {
    let mut meta = ScanMetadata::default();
    if let Some(args) = root.attr("args") {
        meta.args = args.to_string();
    }
    if let Some(info) = root.child("scaninfo") {
        let get = |key: &str| info.attr(key).unwrap_or(UNKNOWN).to_string();
        meta.protocol = get("protocol");
        meta.numservices = get("numservices");
        meta.scan_type = get("type");
    }
    meta
}

/// Script output is the element text; Nmap itself writes it to the
/// `output` attribute, which is used when the text is blank.
fn read_script(script: &Element) -> ScriptResult {
    let text = script.text.trim();
    let output = if text.is_empty() {
        script.attr("output").unwrap_or_default().trim()
    } else {
        text
    };
    ScriptResult {
        id: script.attr("id").unwrap_or_default().to_string(),
        output: output.to_string(),
    }
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
