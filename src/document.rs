use crate::emit::{write_atomically, WriteOutcome};
use crate::error::{ReportError, Result};
use crate::types::ScanReport;
use std::io::Write;
use std::path::Path;

/// Write the full report (metadata plus findings with their scripts) as
/// indented JSON.
pub fn write_document(report: &ScanReport, path: impl AsRef<Path>) -> Result<WriteOutcome> {
    let path = path.as_ref();
    write_atomically(path, |out| -> std::result::Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)
    })?;

    Ok(WriteOutcome::Written {
        target: path.to_path_buf(),
        records: report.findings.len(),
    })
}

/// Parse a document produced by [`write_document`].
pub fn from_json_str(json: &str) -> Result<ScanReport> {
    let mut report: ScanReport =
        serde_json::from_str(json).map_err(|e| ReportError::malformed(e.to_string()))?;
    report.share_metadata();
    Ok(report)
}

/// Read a report document back from disk.
pub fn read_document(path: impl AsRef<Path>) -> Result<ScanReport> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ReportError::NotFound {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    from_json_str(&content).map_err(|e| e.with_origin(path))
}
