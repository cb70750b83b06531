//! Pluggable storage backend for the four append/upsert tables the agent
//! maintains at runtime: raw items, events, alerts, and source runs.
//!
//! Physical schema is explicitly out of scope (spec.md §1); this trait is
//! the seam other components program against, mirroring the teacher's
//! `PersistenceLayer` pattern.

pub mod memory;
pub mod sled_store;

pub use memory::InMemoryStore;
pub use sled_store::SledStore;

use thiserror::Error;

use crate::models::{Alert, Event, RawItem, SourceRun, Tier};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("not found")]
    NotFound,
}

/// Filters accepted by [`Store::list_new_raw_items`], mirroring the ingest
/// runner's selection parameters (spec.md §4.9 step 1).
#[derive(Debug, Clone, Default)]
pub struct NewItemFilter {
    pub source_id: Option<String>,
    pub min_tier: Option<Tier>,
    /// Only items fetched within the last `since_hours` hours.
    pub since_hours: Option<i64>,
    pub limit: Option<usize>,
}

/// Thread-safe storage backend. Implementations must tolerate concurrent
/// readers and serialize writers internally.
pub trait Store: Send + Sync {
    /// Upsert, keyed by `raw_id`. Used both for first insertion (dedup miss)
    /// and for status transitions the ingest runner applies in place.
    fn put_raw_item(&self, item: &RawItem) -> Result<(), StoreError>;

    /// Looks up a raw item by `(source_id, canonical_id)` first, falling
    /// back to `(source_id, content_hash)` — the dedupe key priority order
    /// from spec.md §4.3.
    fn find_raw_item_for_dedupe(
        &self,
        source_id: &str,
        canonical_id: Option<&str>,
        content_hash: &str,
    ) -> Result<Option<RawItem>, StoreError>;

    fn touch_raw_item_fetched_at(&self, source_id: &str, dedupe_key: &str, fetched_at_utc: &str) -> Result<(), StoreError>;

    /// `NEW`-status raw items matching `filter`, excluding items already
    /// marked `SUPPRESSED`, in stable iteration order (callers group by
    /// `source_id` and rely on that stability — spec.md §4.9 step 2).
    fn list_new_raw_items(&self, filter: &NewItemFilter) -> Result<Vec<RawItem>, StoreError>;

    fn put_event(&self, event: &Event) -> Result<(), StoreError>;

    fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError>;

    /// Events with `occurred_at_utc >= since_utc`, in no particular order
    /// (callers that need order sort explicitly).
    fn list_events_since(&self, since_utc: &str) -> Result<Vec<Event>, StoreError>;

    fn put_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError>;

    /// Most recent alert for `correlation_key` with `last_seen_utc >=
    /// since_utc`, used by the correlation upsert window (spec.md §4.8).
    fn find_recent_alert_by_key(&self, correlation_key: &str, since_utc: &str) -> Result<Option<Alert>, StoreError>;

    fn list_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    fn put_source_run(&self, run: &SourceRun) -> Result<(), StoreError>;

    /// Most recent runs for a source, newest first, capped at `limit`.
    fn list_source_runs(&self, source_id: &str, limit: usize) -> Result<Vec<SourceRun>, StoreError>;

    /// All runs for a `run_group_id`, across sources — used by the run
    /// status evaluator.
    fn list_source_runs_for_group(&self, run_group_id: &str) -> Result<Vec<SourceRun>, StoreError>;

    fn backend_name(&self) -> &'static str;
}
