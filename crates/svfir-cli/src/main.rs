//! Program-IR graph-store CLI.
//!
//! Provides the `svfir` binary. It obtains an IR either by loading it back
//! from a graph store (`--read-from-db`) or from a JSON snapshot
//! (`--input`), optionally persists it (`--write2db`), and optionally writes
//! the result as a JSON snapshot (`--output`).
//!
//! Options start from the `SVFIR_*` environment variables; flags given on
//! the command line override them. A JSON summary is printed to stdout and
//! every diagnostic is logged to stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::json;
use tracing::{info, warn, Level};

use svfir_core::{IrSnapshot, SvfIr};
use svfir_graphdb::{load, persist, DbOptions, LoadReport, SqliteGraphDb, WriteReport};

/// Persist program-IR graphs to a graph store and load them back.
#[derive(Parser)]
#[command(name = "svfir", about = "Program-IR graph store tools")]
struct Cli {
    /// Path to the graph store database file.
    #[arg(short, long)]
    db: Option<String>,

    /// JSON snapshot to read the IR from.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the resulting IR as a JSON snapshot.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Load the IR from the graph store instead of a snapshot.
    #[arg(long)]
    read_from_db: bool,

    /// Persist the IR to the graph store.
    #[arg(long = "write2db")]
    write_to_db: bool,

    /// Empty every store before persisting.
    #[arg(long)]
    clear: bool,

    /// Records per page request when loading.
    #[arg(long)]
    page_size: Option<usize>,

    /// Log page fetches and other details.
    #[arg(short, long)]
    verbose: bool,
}

/// Exit codes: 0 = success, 1 = usage or option error,
/// 2 = finished with diagnostics or write failures, 3 = I/O error.
fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    process::exit(run(cli));
}

/// Applies command-line overrides on top of the environment.
fn resolve_options(cli: &Cli) -> Result<DbOptions, String> {
    let mut options = DbOptions::from_env().map_err(|e| e.to_string())?;
    options.read_from_db |= cli.read_from_db;
    options.write_to_db |= cli.write_to_db;
    options.clear_before_write |= cli.clear;
    if let Some(path) = &cli.db {
        options.db_path = path.clone();
    }
    if let Some(size) = cli.page_size {
        if size == 0 {
            return Err("--page-size must be positive".to_string());
        }
        options.page_size = size;
    }
    Ok(options)
}

fn run(cli: Cli) -> i32 {
    let options = match resolve_options(&cli) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };
    if !options.read_from_db && cli.input.is_none() {
        eprintln!("Error: nothing to read, pass --input or --read-from-db");
        return 1;
    }

    let mut store = None;
    if options.read_from_db || options.write_to_db {
        match SqliteGraphDb::new(&options.db_path) {
            Ok(db) => store = Some(db),
            Err(e) => {
                eprintln!("Error: failed to open database '{}': {}", options.db_path, e);
                return 3;
            }
        }
    }

    // Obtain the IR
    let mut load_report = None;
    let ir = match (&mut store, &cli.input) {
        (Some(db), _) if options.read_from_db => {
            let assembly = load(db, &options);
            for diagnostic in &assembly.report.diagnostics {
                warn!(%diagnostic, "load diagnostic");
            }
            load_report = Some(assembly.report);
            assembly.ir
        }
        (_, Some(path)) => match read_snapshot(path) {
            Ok(ir) => ir,
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return 3;
            }
        },
        _ => {
            eprintln!("Error: nothing to read, pass --input or --read-from-db");
            return 1;
        }
    };

    // Persist
    let mut write_report = None;
    if options.write_to_db {
        if let Some(db) = &mut store {
            let report = persist(&ir, db, &options);
            for failure in &report.failures {
                warn!(store = %failure.store, message = %failure.message, "write failed");
            }
            write_report = Some(report);
        }
    }

    if let Some(path) = &cli.output {
        if let Err(msg) = write_snapshot(&ir, path) {
            eprintln!("Error: {}", msg);
            return 3;
        }
        info!(path = %path.display(), "snapshot written");
    }

    println!("{}", summary(&ir, load_report.as_ref(), write_report.as_ref()));

    let clean_load = load_report.as_ref().map_or(true, LoadReport::is_clean);
    let clean_write = write_report.as_ref().map_or(true, WriteReport::is_complete);
    if clean_load && clean_write {
        0
    } else {
        2
    }
}

/// Reads a JSON snapshot, rejecting inconsistent ones.
fn read_snapshot(path: &Path) -> Result<SvfIr, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let snapshot: IrSnapshot = serde_json::from_str(&text)
        .map_err(|e| format!("'{}' is not an IR snapshot: {}", path.display(), e))?;
    snapshot
        .into_ir()
        .map_err(|e| format!("inconsistent snapshot '{}': {}", path.display(), e))
}

fn write_snapshot(ir: &SvfIr, path: &Path) -> Result<(), String> {
    let text = serde_json::to_string_pretty(ir).map_err(|e| format!("failed to serialize IR: {}", e))?;
    fs::write(path, text).map_err(|e| format!("failed to write '{}': {}", path.display(), e))
}

/// Machine-readable outcome of one run.
fn summary(ir: &SvfIr, load: Option<&LoadReport>, write: Option<&WriteReport>) -> String {
    let mut out = json!({
        "nodes": ir.node_count(),
        "edges": ir.edge_count(),
    });
    if let Some(report) = load {
        out["load"] = json!({
            "records_read": report.records_read,
            "entities_built": report.entities_built,
            "pages_fetched": report.pages_fetched,
            "diagnostics": report.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        });
    }
    if let Some(report) = write {
        out["write"] = json!({
            "statements_written": report.total_written(),
            "failures": report.failures.len(),
        });
    }
    serde_json::to_string_pretty(&out)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize summary: {}\"}}", e))
}
