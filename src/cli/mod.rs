//! Thin CLI shell: parses arguments, wires the pipeline modules together,
//! and emits RunRecords. Help text, table rendering, and markdown output
//! are explicitly out of scope (spec.md §1) — every command prints a
//! single JSON document to stdout and returns an exit code.

mod bootstrap;
mod brief;
mod ops;
mod paths;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::Tier;
use crate::run_status::RunStatus;

fn parse_tier(s: &str) -> Result<Tier, String> {
    match s.to_ascii_lowercase().as_str() {
        "global" => Ok(Tier::Global),
        "regional" => Ok(Tier::Regional),
        "local" => Ok(Tier::Local),
        "unknown" => Ok(Tier::Unknown),
        other => Err(format!("unknown tier: {other}")),
    }
}

#[derive(Debug, Parser)]
#[command(name = "hardstop")]
#[command(about = "Local-first risk-intelligence agent")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,
    #[arg(long, global = true, default_value = "fixtures")]
    pub fixtures_dir: PathBuf,
    #[arg(long, global = true, default_value = "output")]
    pub output_dir: PathBuf,
    /// Overrides `hardstop.toml`'s `strict` flag for this invocation.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetches every enabled source and saves new items to the raw-item repo.
    Fetch {
        #[arg(long, value_parser = parse_tier)]
        tier: Option<Tier>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        since_hours: Option<i64>,
        #[arg(long)]
        max_items: Option<usize>,
        #[arg(long)]
        fail_fast: bool,
        #[arg(long)]
        run_group: Option<String>,
    },
    /// Processes NEW raw items into events and alerts.
    IngestExternal {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_parser = parse_tier)]
        min_tier: Option<Tier>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        since_hours: Option<i64>,
        #[arg(long)]
        no_suppress: bool,
        #[arg(long)]
        explain_suppress: bool,
        #[arg(long)]
        fail_fast: bool,
        #[arg(long)]
        allow_ingest_errors: bool,
        #[arg(long)]
        run_group: Option<String>,
    },
    /// Fetch, then ingest, then evaluate run status. Exit code encodes
    /// HEALTHY (0) / WARNING (1) / BROKEN (2).
    Run {
        #[arg(long, value_parser = parse_tier)]
        tier: Option<Tier>,
        #[arg(long)]
        fail_fast: bool,
        #[arg(long)]
        allow_ingest_errors: bool,
    },
    /// Prints the `brief.v1` read model for the trailing window.
    Brief {
        #[arg(long, default_value_t = 24)]
        since_hours: i64,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Aggregated health + config/schema checks with a suggested next step.
    Doctor,
    /// Incident evidence operations.
    Incidents {
        #[command(subcommand)]
        action: IncidentsAction,
    },
    /// Source inspection operations.
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },
    /// Artifact export operations.
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
    /// Scaffolds default config files and directories.
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum IncidentsAction {
    /// Recomputes an IncidentEvidence artifact's hash and reports mismatches.
    Replay {
        #[arg(long)]
        alert_id: Option<String>,
        #[arg(long)]
        event_id: Option<String>,
        #[arg(long)]
        correlation_key: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SourcesAction {
    List,
    Test {
        #[arg(long)]
        source: String,
        #[arg(long)]
        since_hours: Option<i64>,
    },
    Health {
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = 20)]
        lookback: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExportAction {
    Brief {
        #[arg(long, default_value_t = 24)]
        since_hours: i64,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    Alerts,
    Sources,
}

/// Parses `std::env::args`, dispatches to the matching operation, prints
/// its JSON result to stdout, and returns the process exit code.
pub fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    ops::dispatch(cli)
}

pub(crate) fn status_exit_code(status: RunStatus) -> i32 {
    status.exit_code()
}
