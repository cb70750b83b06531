//! `RawItem` — the unmodified record of a single fetched feed entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Tier;

/// Pipeline status, per spec.md §3: only advances `New -> Normalized` or
/// `New -> Failed`. Suppressed items remain `New` — suppression is tracked
/// by the separate `suppression_status`/`primary_rule_id` fields below, not
/// by this enum, so that a suppressed item's pipeline position stays
/// legible from `status` alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RawItemStatus {
    New,
    Normalized,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuppressionStatus {
    None,
    Suppressed,
}

impl Default for SuppressionStatus {
    fn default() -> Self {
        SuppressionStatus::None
    }
}

/// A single item as returned by a source adapter, before normalization.
///
/// `content_hash` is computed by [`crate::dedup::compute_content_hash`] over
/// a stable subset of these fields and is what dedupe keys on when the
/// adapter has no `canonical_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawItem {
    pub raw_id: String,
    pub source_id: String,
    pub tier: Tier,
    pub canonical_id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    /// Adapter-specific extra fields (tags, geo metadata, raw API payload).
    pub payload: Value,
    pub fetched_at_utc: String,
    pub published_at_utc: Option<String>,
    pub content_hash: String,
    pub status: RawItemStatus,
    pub trust_tier: u8,
    pub suppression_status: SuppressionStatus,
    pub primary_rule_id: Option<String>,
    pub rule_ids: Vec<String>,
    pub suppressed_at_utc: Option<String>,
    pub suppression_stage: Option<String>,
    pub reason_code: Option<String>,
}

impl RawItem {
    /// Best-effort text used by downstream normalization when `summary`,
    /// `description`, and `content` are all candidates for the event's
    /// `raw_text`, in that priority order.
    pub fn best_body_text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.description.as_deref().filter(|s| !s.is_empty()))
            .or_else(|| self.content.as_deref().filter(|s| !s.is_empty()))
    }

    /// The `(source_id, canonical_id)` or `(source_id, content_hash)`
    /// dedupe key this row was stored under, per spec.md §4.3.
    pub fn dedupe_key(&self) -> &str {
        self.canonical_id.as_deref().unwrap_or(&self.content_hash)
    }
}
