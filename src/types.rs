use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Placeholder stored when the document does not say.
pub const UNKNOWN: &str = "unknown";

/// Scan-level attributes taken from `<scaninfo>` and the root element.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanMetadata {
    pub protocol: String,
    pub numservices: String,
    pub scan_type: String,
    pub args: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            protocol: UNKNOWN.to_string(),
            numservices: UNKNOWN.to_string(),
            scan_type: UNKNOWN.to_string(),
            args: String::new(),
        }
    }
}

/// Output of one NSE script run against a port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptResult {
    pub id: String,
    pub output: String,
}

/// One normalized record per (host, protocol, port) in the document.
///
/// Absent optional values are already defaulted here (`""` for service
/// fingerprint fields, `"unknown"` for host/port state), so emitters never
/// check for presence themselves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub timestamp: String,
    pub host: String,
    pub hostname: String,
    pub host_status: String,
    pub protocol: String,
    pub port: String,
    pub state: String,
    pub service: String,
    pub version: String,
    pub product: String,
    pub extrainfo: String,
    pub scripts: Vec<ScriptResult>,
    #[serde(skip)]
    pub scan_info: Arc<ScanMetadata>,
}

impl Finding {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    /// Field-wise equality that ignores the extraction timestamp.
    pub fn same_record(&self, other: &Finding) -> bool {
        self.host == other.host
            && self.hostname == other.hostname
            && self.host_status == other.host_status
            && self.protocol == other.protocol
            && self.port == other.port
            && self.state == other.state
            && self.service == other.service
            && self.version == other.version
            && self.product == other.product
            && self.extrainfo == other.extrainfo
            && self.scripts == other.scripts
            && self.scan_info == other.scan_info
    }
}

/// Everything extracted from one document, read-only once built.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub scan_info: Arc<ScanMetadata>,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Point every finding at this report's metadata.
    pub(crate) fn share_metadata(&mut self) {
        for finding in &mut self.findings {
            finding.scan_info = Arc::clone(&self.scan_info);
        }
    }
}
