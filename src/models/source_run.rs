//! `SourceRun` — one row per (source, run_group, phase).
//!
//! The ingest runner's hardest contract (spec.md §4.9): exactly one
//! `INGEST` row is written per `(source_id, run_group_id)` no matter how
//! the batch fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunPhase {
    Fetch,
    Ingest,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRun {
    pub run_id: String,
    pub source_id: String,
    pub run_group_id: String,
    pub phase: RunPhase,
    pub status: RunOutcome,
    pub started_at_utc: String,
    pub completed_at_utc: String,
    /// FETCH counter.
    pub items_fetched: usize,
    /// FETCH counter: items that produced a freshly created raw-item row.
    pub items_new: usize,
    pub items_duplicate: usize,
    /// INGEST counter: items pulled out of the NEW queue for this batch.
    pub items_processed: usize,
    /// INGEST counter.
    pub items_suppressed: usize,
    /// INGEST counter.
    pub items_events_created: usize,
    /// INGEST counter.
    pub items_alerts_touched: usize,
    pub items_errored: usize,
    /// Truncated to 1000 chars, matching the original's error-message cap.
    pub error_message: Option<String>,
    pub diagnostics_json: Option<Value>,
    pub http_status: Option<u16>,
    pub bytes_downloaded: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl SourceRun {
    pub fn truncate_error(message: &str) -> String {
        const MAX: usize = 1000;
        if message.len() <= MAX {
            message.to_string()
        } else {
            let mut truncated = message.chars().take(MAX).collect::<String>();
            truncated.push('…');
            truncated
        }
    }
}
