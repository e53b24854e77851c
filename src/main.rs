use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use nmap_report_rs::emit::{
    self, EmitOutcome, EmitterKind, OutputTargets, WriteOutcome, DEFAULT_SCRIPT_OUTPUT_LIMIT,
};
use nmap_report_rs::{extract, loader, ReportError};

use anyhow::Result;
use clap::Parser;
use tracing::error;

/// Loading or parsing the scan document failed.
const EXIT_LOAD_FAILURE: u8 = 1;
/// At least one requested output could not be written. 2 is taken by clap.
const EXIT_WRITE_FAILURE: u8 = 3;

/// nmap-report-rs — Turn Nmap XML scan results into CSV, pretty JSON and a console summary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nmap-report-rs",
    version,
    about = "Turn Nmap XML scan results into CSV, pretty JSON and a console summary.",
    long_about = None
)]
struct Cli {
    /// Nmap XML document to read (as written by `nmap -oX`).
    input: PathBuf,

    /// Write findings as CSV to this path, one row per finding and script (optional).
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write findings as pretty JSON to this path (optional).
    #[arg(long)]
    json: Option<PathBuf>,

    /// Characters of script output kept per CSV row.
    #[arg(
        long = "script-output-limit",
        env = "NMAP_REPORT_SCRIPT_LIMIT",
        default_value_t = DEFAULT_SCRIPT_OUTPUT_LIMIT
    )]
    script_output_limit: usize,

    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable logging entirely.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(failures) if failures.is_empty() => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("\n{} output(s) failed:", failures.len());
            for e in &failures {
                eprintln!("  - {e} (no output produced)");
            }
            ExitCode::from(EXIT_WRITE_FAILURE)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_LOAD_FAILURE)
        }
    }
}

/// Load, extract and emit. Loader errors abort; emitter errors are returned
/// together once every emitter has run.
async fn run(cli: Cli) -> Result<Vec<ReportError>> {
    let tree = loader::load_document(&cli.input).await?;
    let report = Arc::new(extract::extract(&tree));

    let targets = OutputTargets {
        table: cli.csv,
        document: cli.json,
        script_output_limit: cli.script_output_limit,
    };

    let mut failures = Vec::new();
    for outcome in emit::run_file_emitters(Arc::clone(&report), &targets).await {
        record(outcome, &mut failures);
    }
    record(
        emit::emit_summary(&report, &mut io::stdout().lock()),
        &mut failures,
    );

    Ok(failures)
}

/// Print the confirmation for a successful file emitter or keep its error.
fn record(outcome: EmitOutcome, failures: &mut Vec<ReportError>) {
    match (outcome.kind, outcome.result) {
        (kind, Err(e)) => {
            error!(code = e.code(), "{} output failed: {}", kind, e);
            failures.push(e);
        }
        (EmitterKind::Summary, Ok(_)) => {}
        (kind, Ok(WriteOutcome::Written { target, records })) => {
            println!(
                "✓ {} results saved to {} ({} records)",
                kind,
                target.display(),
                records
            );
        }
        (kind, Ok(WriteOutcome::NothingToWrite)) => {
            println!("No results to write to {}", kind);
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
