//! Content hashing and dedupe/save semantics for raw items.
//!
//! Grounded in `sentinel/retrieval/dedupe.py`: a candidate is looked up by
//! `(source_id, canonical_id)` first, falling back to
//! `(source_id, content_hash)`; a hit refreshes `fetched_at_utc` without
//! advancing `status`, and only a miss counts toward `items_new`.

use serde_json::json;

use crate::adapters::Candidate;
use crate::canonical::{canonical_json, sha256_hex};
use crate::models::{RawItem, RawItemStatus, Tier};
use crate::store::{Store, StoreError};

/// `SHA-256` over a canonical JSON of
/// `{canonical_id, title, url, payload_content{title,summary,description,content}}`
/// with sorted keys, per spec.md §4.3.
pub fn compute_content_hash(candidate: &Candidate) -> String {
    let value = json!({
        "canonical_id": candidate.canonical_id,
        "title": candidate.title,
        "url": candidate.url,
        "payload_content": {
            "title": candidate.title,
            "summary": candidate.summary,
            "description": candidate.description,
            "content": candidate.content,
        }
    });
    let canonical = canonical_json(&value).unwrap_or_default();
    sha256_hex(&canonical)
}

/// Outcome of [`save_candidate`] — whether the candidate produced a new row
/// or only refreshed an existing one's `fetched_at_utc`.
pub enum SaveOutcome {
    Created(RawItem),
    Duplicate(RawItem),
}

impl SaveOutcome {
    pub fn raw_item(&self) -> &RawItem {
        match self {
            SaveOutcome::Created(item) | SaveOutcome::Duplicate(item) => item,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SaveOutcome::Created(_))
    }
}

/// Looks the candidate up in the raw-item repo; on a miss, inserts a new
/// `NEW`-status row; on a hit, refreshes `fetched_at_utc` and returns the
/// existing row untouched otherwise. Duplicates never advance `status`.
pub fn save_candidate(
    store: &dyn Store,
    source_id: &str,
    tier: Tier,
    trust_tier: u8,
    candidate: &Candidate,
    fetched_at_utc: &str,
) -> Result<SaveOutcome, StoreError> {
    let content_hash = compute_content_hash(candidate);
    if let Some(mut existing) =
        store.find_raw_item_for_dedupe(source_id, candidate.canonical_id.as_deref(), &content_hash)?
    {
        let dedupe_key = existing.dedupe_key().to_string();
        store.touch_raw_item_fetched_at(source_id, &dedupe_key, fetched_at_utc)?;
        existing.fetched_at_utc = fetched_at_utc.to_string();
        return Ok(SaveOutcome::Duplicate(existing));
    }

    let item = RawItem {
        raw_id: uuid::Uuid::new_v4().to_string(),
        source_id: source_id.to_string(),
        tier,
        canonical_id: candidate.canonical_id.clone(),
        title: candidate.title.clone(),
        url: candidate.url.clone(),
        summary: candidate.summary.clone(),
        description: candidate.description.clone(),
        content: candidate.content.clone(),
        payload: candidate.payload.clone(),
        fetched_at_utc: fetched_at_utc.to_string(),
        published_at_utc: candidate.published_at_utc.clone(),
        content_hash,
        status: RawItemStatus::New,
        trust_tier,
        suppression_status: Default::default(),
        primary_rule_id: None,
        rule_ids: Vec::new(),
        suppressed_at_utc: None,
        suppression_stage: None,
        reason_code: None,
    };
    store.put_raw_item(&item)?;
    Ok(SaveOutcome::Created(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn candidate(canonical_id: Option<&str>, title: &str) -> Candidate {
        Candidate {
            canonical_id: canonical_id.map(str::to_string),
            title: title.to_string(),
            url: None,
            summary: None,
            description: None,
            content: None,
            published_at_utc: None,
            payload: json!({}),
        }
    }

    #[test]
    fn idempotent_dedupe_by_canonical_id() {
        let store = InMemoryStore::new();
        let c = candidate(Some("abc"), "Storm warning");
        let first = save_candidate(&store, "s1", crate::models::Tier::Regional, 2, &c, "2026-07-28T00:00:00Z").unwrap();
        assert!(first.is_new());
        let second = save_candidate(&store, "s1", crate::models::Tier::Regional, 2, &c, "2026-07-28T01:00:00Z").unwrap();
        assert!(!second.is_new());
        assert_eq!(second.raw_item().fetched_at_utc, "2026-07-28T01:00:00Z");
    }

    #[test]
    fn falls_back_to_content_hash_when_no_canonical_id() {
        let store = InMemoryStore::new();
        let c = candidate(None, "Storm warning");
        let first = save_candidate(&store, "s1", crate::models::Tier::Regional, 2, &c, "2026-07-28T00:00:00Z").unwrap();
        assert!(first.is_new());
        let second = save_candidate(&store, "s1", crate::models::Tier::Regional, 2, &c, "2026-07-28T01:00:00Z").unwrap();
        assert!(!second.is_new());
    }

    #[test]
    fn content_hash_is_stable_for_identical_fields() {
        let a = candidate(Some("x"), "Same title");
        let b = candidate(Some("x"), "Same title");
        assert_eq!(compute_content_hash(&a), compute_content_hash(&b));
    }
}
