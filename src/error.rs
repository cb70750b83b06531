//! Crate-wide error types.
//!
//! Each module defines its own narrow error enum (`ConfigError`,
//! `StoreError`, `AdapterError`, ...); `HardstopError` aggregates them at
//! the points where more than one subsystem's errors can surface together
//! (the ingest runner, the CLI shell).

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::artifacts::ArtifactError;
use crate::config::ConfigError;
use crate::correlation::CorrelationError;
use crate::ingest::IngestError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum HardstopError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("correlation error: {0}")]
    Correlation(#[from] CorrelationError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("ingest aborted: {0}")]
    IngestAborted(String),
}

pub type Result<T> = std::result::Result<T, HardstopError>;
