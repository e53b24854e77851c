//! Error types for nmap-report-rs

use std::path::Path;
use thiserror::Error;

/// Result type alias using [`ReportError`]
pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    // === Loading Errors ===
    #[error("scan document not readable: {path}: {reason}")]
    NotFound { path: String, reason: String },

    #[error("malformed scan document {origin}: {reason}")]
    MalformedDocument { origin: String, reason: String },

    // === Output Errors ===
    #[error("failed to write {target}: {reason}")]
    WriteFailure { target: String, reason: String },
}

impl ReportError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ReportError::MalformedDocument {
            origin: String::from("<input>"),
            reason: reason.into(),
        }
    }

    pub(crate) fn write_failure(target: impl AsRef<Path>, reason: impl ToString) -> Self {
        ReportError::WriteFailure {
            target: target.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Attach the document path to a parse error raised on in-memory content.
    pub fn with_origin(self, path: impl AsRef<Path>) -> Self {
        match self {
            ReportError::MalformedDocument { reason, .. } => ReportError::MalformedDocument {
                origin: path.as_ref().display().to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Loading errors stop the run; write errors only affect one emitter.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReportError::NotFound { .. } | ReportError::MalformedDocument { .. }
        )
    }

    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::NotFound { .. } => "NOT_FOUND",
            ReportError::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            ReportError::WriteFailure { .. } => "WRITE_FAILURE",
        }
    }
}
