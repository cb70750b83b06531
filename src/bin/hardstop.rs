//! Binary entrypoint. The CLI's own command loop is synchronous (spec.md
//! §1: fetch/ingest/correlate run on the calling thread); this wrapper only
//! supplies the tokio runtime reqwest's async client needs under the hood
//! and the logging setup, then hands off via `block_in_place`.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let exit_code = tokio::task::block_in_place(hardstop::cli::run)?;
    std::process::exit(exit_code);
}
