//! Output targets and the shared plumbing used by the file emitters.

use crate::document;
use crate::error::{ReportError, Result};
use crate::summary;
use crate::table;
use crate::types::ScanReport;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Characters of script output kept per table row unless configured otherwise.
pub const DEFAULT_SCRIPT_OUTPUT_LIMIT: usize = 100;

/// Which emitters run and where they write. `None` skips that emitter.
#[derive(Debug, Clone)]
pub struct OutputTargets {
    pub table: Option<PathBuf>,
    pub document: Option<PathBuf>,
    pub script_output_limit: usize,
}

impl Default for OutputTargets {
    fn default() -> Self {
        Self {
            table: None,
            document: None,
            script_output_limit: DEFAULT_SCRIPT_OUTPUT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterKind {
    Table,
    Document,
    Summary,
}

impl fmt::Display for EmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmitterKind::Table => "CSV",
            EmitterKind::Document => "JSON",
            EmitterKind::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// What an emitter did when it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { target: PathBuf, records: usize },
    /// Empty result set: nothing was written and no file was created.
    NothingToWrite,
}

#[derive(Debug)]
pub struct EmitOutcome {
    pub kind: EmitterKind,
    pub result: Result<WriteOutcome>,
}

/// Run every configured file emitter on its own blocking task.
///
/// Each emitter only reads `report`; a failure in one is recorded in its
/// outcome and never stops the others. Outcomes come back table first.
pub async fn run_file_emitters(report: Arc<ScanReport>, targets: &OutputTargets) -> Vec<EmitOutcome> {
    let mut handles = Vec::new();

    if let Some(path) = targets.table.clone() {
        let report = Arc::clone(&report);
        let limit = targets.script_output_limit;
        handles.push((
            EmitterKind::Table,
            path.clone(),
            tokio::task::spawn_blocking(move || table::write_table(&report, &path, limit)),
        ));
    }

    if let Some(path) = targets.document.clone() {
        let report = Arc::clone(&report);
        handles.push((
            EmitterKind::Document,
            path.clone(),
            tokio::task::spawn_blocking(move || document::write_document(&report, &path)),
        ));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (kind, path, handle) in handles {
        let result = match handle.await {
            Ok(res) => res,
            Err(e) => Err(ReportError::write_failure(&path, format!("emitter task failed: {e}"))),
        };
        debug!("{} emitter finished: {:?}", kind, result);
        outcomes.push(EmitOutcome { kind, result });
    }
    outcomes
}

/// Print the console summary into `out`, reported the same way as the file
/// emitters. An empty report prints only the "no results" notice.
pub fn emit_summary(report: &ScanReport, out: &mut impl Write) -> EmitOutcome {
    let result = summary::print_summary(report, out).map(|_| {
        if report.is_empty() {
            WriteOutcome::NothingToWrite
        } else {
            WriteOutcome::Written {
                target: PathBuf::from("<stdout>"),
                records: report.findings.len(),
            }
        }
    });
    EmitOutcome {
        kind: EmitterKind::Summary,
        result,
    }
}

/// Write through a temporary file next to `path` and move it into place
/// only once `write` and the flush succeed. Missing parent directories are
/// created first.
pub(crate) fn write_atomically<F, E>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::result::Result<(), E>,
    E: fmt::Display,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| ReportError::write_failure(path, e))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| ReportError::write_failure(path, e))?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out).map_err(|e| ReportError::write_failure(path, e))?;
        out.flush().map_err(|e| ReportError::write_failure(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| ReportError::write_failure(path, e.error))?;

    info!("Wrote {}", path.display());
    Ok(())
}
