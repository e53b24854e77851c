use crate::emit::{write_atomically, WriteOutcome};
use crate::error::Result;
use crate::types::{Finding, ScanReport};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One CSV row. Field order is the column order of the file.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TableRow<'a> {
    pub timestamp: &'a str,
    pub host: &'a str,
    pub hostname: &'a str,
    pub host_status: &'a str,
    pub protocol: &'a str,
    pub port: &'a str,
    pub state: &'a str,
    pub service: &'a str,
    pub version: &'a str,
    pub product: &'a str,
    pub extrainfo: &'a str,
    pub script_id: &'a str,
    pub script_output: &'a str,
}

impl<'a> TableRow<'a> {
    fn base(f: &'a Finding) -> Self {
        Self {
            timestamp: &f.timestamp,
            host: &f.host,
            hostname: &f.hostname,
            host_status: &f.host_status,
            protocol: &f.protocol,
            port: &f.port,
            state: &f.state,
            service: &f.service,
            version: &f.version,
            product: &f.product,
            extrainfo: &f.extrainfo,
            script_id: "",
            script_output: "",
        }
    }
}

/// Flatten findings into rows: one per script, or a single row with empty
/// script columns when a finding has none.
pub fn flatten(findings: &[Finding], script_output_limit: usize) -> Vec<TableRow<'_>> {
    let mut rows = Vec::new();
    for f in findings {
        if f.scripts.is_empty() {
            rows.push(TableRow::base(f));
            continue;
        }
        for script in &f.scripts {
            rows.push(TableRow {
                script_id: &script.id,
                script_output: truncate_chars(&script.output, script_output_limit),
                ..TableRow::base(f)
            });
        }
    }
    rows
}

/// Write the CSV table to `path`.
///
/// An empty report writes nothing and returns [`WriteOutcome::NothingToWrite`].
pub fn write_table(
    report: &ScanReport,
    path: impl AsRef<Path>,
    script_output_limit: usize,
) -> Result<WriteOutcome> {
    let path = path.as_ref();
    if report.is_empty() {
        info!("No findings, not writing CSV to {}", path.display());
        return Ok(WriteOutcome::NothingToWrite);
    }

    let rows = flatten(&report.findings, script_output_limit);
    write_atomically(path, |out| -> std::result::Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(out);
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    })?;

    Ok(WriteOutcome::Written {
        target: path.to_path_buf(),
        records: rows.len(),
    })
}

/// Hard cut at `max` characters, never splitting a UTF-8 sequence.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
