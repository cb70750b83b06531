//! Source adapters: per-format fetchers that turn an HTTP response into a
//! list of [`Candidate`] rows, per spec.md §4.1.
//!
//! Adapters are pure over the network response: no DB writes, no global
//! state. Each exposes an `adapter_version` string so the fetcher can build
//! the `inputs_version` field of `BestEffortMetadata` (spec.md §4.2).

pub mod fema;
pub mod http;
pub mod nws_alerts;
pub mod rss;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::http::Transport;
use crate::config::sources::{SourceDef, SourceKind};

#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported source type: {0}")]
    UnsupportedSourceType(String),
}

impl AdapterError {
    /// HTTP status code, when the failure carries one — mirrors the
    /// `FAILURE` status-code surfacing from spec.md §4.1/§4.2.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AdapterError::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }
}

/// A single fetched item, normalized to the shape the dedup/ingest layer
/// expects regardless of source format. `payload` carries the adapter's full
/// original mapping, preserved for suppression's `any` field and for the
/// normalizer's payload-field location hints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub canonical_id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published_at_utc: Option<String>,
    pub payload: serde_json::Value,
}

/// Outcome of a single adapter fetch call, before dedup/save — the
/// candidates plus enough diagnostics for the fetcher to populate
/// `FetchResult`.
pub struct AdapterFetch {
    pub items: Vec<Candidate>,
    pub status_code: Option<u16>,
    pub bytes_downloaded: u64,
}

/// Capability every source adapter implements: fetch since an optional
/// cutoff, bounded to `max_items`, returning candidates plus diagnostics.
/// Errors map to `FAILURE` at the fetcher layer (spec.md §4.2).
pub trait SourceAdapter {
    /// Stable identifier embedded in `BestEffortMetadata.inputs_version`.
    fn adapter_version(&self) -> &'static str;

    fn fetch(
        &self,
        transport: &dyn Transport,
        source: &SourceDef,
        since_hours: Option<i64>,
        max_items: usize,
    ) -> Result<AdapterFetch, AdapterError>;
}

/// Resolves the adapter implementation for a source's configured type.
pub fn adapter_for(kind: SourceKind) -> Box<dyn SourceAdapter> {
    match kind {
        SourceKind::Rss | SourceKind::Atom => Box::new(rss::RssAdapter),
        SourceKind::NwsAlerts | SourceKind::Ipaws => Box::new(nws_alerts::NwsAlertsAdapter),
        SourceKind::Fema => Box::new(fema::FemaAdapter),
    }
}
