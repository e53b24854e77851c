//! Library crate for nmap-report-rs: load an Nmap XML document, extract
//! findings and render them as CSV, JSON and a console summary.
pub mod document;
pub mod emit;
pub mod error;
pub mod extract;
pub mod loader;
pub mod summary;
pub mod table;
pub mod types;

pub use error::{ReportError, Result};
pub use types::{Finding, ScanMetadata, ScanReport, ScriptResult};
