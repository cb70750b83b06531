//! In-memory store for unit tests and minimal deployments. Not durable.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{Alert, Event, RawItem, RawItemStatus, SourceRun, SuppressionStatus};
use crate::store::{NewItemFilter, Store, StoreError};
use crate::time_utils::parse_z;

#[derive(Default)]
pub struct InMemoryStore {
    raw_items: RwLock<HashMap<String, RawItem>>,
    events: RwLock<HashMap<String, Event>>,
    alerts: RwLock<HashMap<String, Alert>>,
    source_runs: RwLock<Vec<SourceRun>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl Store for InMemoryStore {
    fn put_raw_item(&self, item: &RawItem) -> Result<(), StoreError> {
        let mut items = self.raw_items.write().map_err(lock_err)?;
        items.insert(item.raw_id.clone(), item.clone());
        Ok(())
    }

    fn find_raw_item_for_dedupe(
        &self,
        source_id: &str,
        canonical_id: Option<&str>,
        content_hash: &str,
    ) -> Result<Option<RawItem>, StoreError> {
        let items = self.raw_items.read().map_err(lock_err)?;
        if let Some(cid) = canonical_id {
            if let Some(found) = items
                .values()
                .find(|i| i.source_id == source_id && i.canonical_id.as_deref() == Some(cid))
            {
                return Ok(Some(found.clone()));
            }
        }
        Ok(items
            .values()
            .find(|i| i.source_id == source_id && i.content_hash == content_hash)
            .cloned())
    }

    fn touch_raw_item_fetched_at(&self, source_id: &str, dedupe_key: &str, fetched_at_utc: &str) -> Result<(), StoreError> {
        let mut items = self.raw_items.write().map_err(lock_err)?;
        if let Some(item) = items.values_mut().find(|i| {
            i.source_id == source_id
                && (i.canonical_id.as_deref() == Some(dedupe_key) || i.content_hash == dedupe_key)
        }) {
            item.fetched_at_utc = fetched_at_utc.to_string();
        }
        Ok(())
    }

    fn list_new_raw_items(&self, filter: &NewItemFilter) -> Result<Vec<RawItem>, StoreError> {
        let items = self.raw_items.read().map_err(lock_err)?;
        let cutoff = filter.since_hours.and_then(|hours| {
            let now = chrono::Utc::now();
            Some(now - chrono::Duration::hours(hours))
        });
        let mut matching: Vec<RawItem> = items
            .values()
            .filter(|i| i.status == RawItemStatus::New)
            .filter(|i| i.suppression_status != SuppressionStatus::Suppressed)
            .filter(|i| filter.source_id.as_deref().map_or(true, |s| s == i.source_id))
            .filter(|i| filter.min_tier.map_or(true, |t| i.tier.rank() >= t.rank()))
            .filter(|i| match cutoff {
                None => true,
                Some(cutoff) => parse_z(&i.fetched_at_utc).map_or(true, |ts| ts >= cutoff),
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.raw_id.cmp(&b.raw_id));
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    fn put_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut events = self.events.write().map_err(lock_err)?;
        events.insert(event.event_id.clone(), event.clone());
        Ok(())
    }

    fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        let events = self.events.read().map_err(lock_err)?;
        Ok(events.get(event_id).cloned())
    }

    fn list_events_since(&self, since_utc: &str) -> Result<Vec<Event>, StoreError> {
        let events = self.events.read().map_err(lock_err)?;
        Ok(events
            .values()
            .filter(|e| e.occurred_at_utc.as_str() >= since_utc)
            .cloned()
            .collect())
    }

    fn put_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().map_err(lock_err)?;
        alerts.insert(alert.alert_id.clone(), alert.clone());
        Ok(())
    }

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        let alerts = self.alerts.read().map_err(lock_err)?;
        Ok(alerts.get(alert_id).cloned())
    }

    fn find_recent_alert_by_key(&self, correlation_key: &str, since_utc: &str) -> Result<Option<Alert>, StoreError> {
        let alerts = self.alerts.read().map_err(lock_err)?;
        Ok(alerts
            .values()
            .filter(|a| a.correlation_key == correlation_key && a.last_seen_utc.as_str() >= since_utc)
            .max_by(|a, b| a.last_seen_utc.cmp(&b.last_seen_utc))
            .cloned())
    }

    fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.alerts.read().map_err(lock_err)?;
        Ok(alerts.values().cloned().collect())
    }

    fn put_source_run(&self, run: &SourceRun) -> Result<(), StoreError> {
        let mut runs = self.source_runs.write().map_err(lock_err)?;
        runs.push(run.clone());
        Ok(())
    }

    fn list_source_runs(&self, source_id: &str, limit: usize) -> Result<Vec<SourceRun>, StoreError> {
        let runs = self.source_runs.read().map_err(lock_err)?;
        let mut matching: Vec<SourceRun> = runs.iter().filter(|r| r.source_id == source_id).cloned().collect();
        matching.sort_by(|a, b| b.started_at_utc.cmp(&a.started_at_utc));
        matching.truncate(limit);
        Ok(matching)
    }

    fn list_source_runs_for_group(&self, run_group_id: &str) -> Result<Vec<SourceRun>, StoreError> {
        let runs = self.source_runs.read().map_err(lock_err)?;
        Ok(runs.iter().filter(|r| r.run_group_id == run_group_id).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunOutcome, RunPhase, Tier};

    fn make_run(source_id: &str, group: &str, started: &str) -> SourceRun {
        SourceRun {
            run_id: format!("run-{source_id}-{started}"),
            source_id: source_id.to_string(),
            run_group_id: group.to_string(),
            phase: RunPhase::Ingest,
            status: RunOutcome::Success,
            started_at_utc: started.to_string(),
            completed_at_utc: started.to_string(),
            items_fetched: 0,
            items_new: 0,
            items_duplicate: 0,
            items_processed: 0,
            items_suppressed: 0,
            items_events_created: 0,
            items_alerts_touched: 0,
            items_errored: 0,
            error_message: None,
            diagnostics_json: None,
            http_status: None,
            bytes_downloaded: None,
            duration_ms: None,
        }
    }

    fn make_raw_item(raw_id: &str, source_id: &str, canonical_id: Option<&str>) -> RawItem {
        RawItem {
            raw_id: raw_id.to_string(),
            source_id: source_id.to_string(),
            tier: Tier::Regional,
            canonical_id: canonical_id.map(str::to_string),
            title: "t".to_string(),
            url: None,
            summary: None,
            description: None,
            content: None,
            payload: serde_json::json!({}),
            fetched_at_utc: "2026-07-01T00:00:00Z".to_string(),
            published_at_utc: None,
            content_hash: format!("hash-{raw_id}"),
            status: RawItemStatus::New,
            trust_tier: 2,
            suppression_status: SuppressionStatus::None,
            primary_rule_id: None,
            rule_ids: Vec::new(),
            suppressed_at_utc: None,
            suppression_stage: None,
            reason_code: None,
        }
    }

    #[test]
    fn list_source_runs_orders_newest_first() {
        let store = InMemoryStore::new();
        store.put_source_run(&make_run("s1", "g1", "2026-07-01T00:00:00Z")).unwrap();
        store.put_source_run(&make_run("s1", "g1", "2026-07-03T00:00:00Z")).unwrap();
        store.put_source_run(&make_run("s1", "g1", "2026-07-02T00:00:00Z")).unwrap();
        let runs = store.list_source_runs("s1", 10).unwrap();
        assert_eq!(runs[0].started_at_utc, "2026-07-03T00:00:00Z");
        assert_eq!(runs[2].started_at_utc, "2026-07-01T00:00:00Z");
    }

    #[test]
    fn dedupe_lookup_prefers_canonical_id() {
        let store = InMemoryStore::new();
        let item = make_raw_item("raw-1", "s1", Some("abc"));
        store.put_raw_item(&item).unwrap();
        let found = store.find_raw_item_for_dedupe("s1", Some("abc"), "different-hash").unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn put_raw_item_is_an_upsert_not_an_append() {
        let store = InMemoryStore::new();
        let mut item = make_raw_item("raw-1", "s1", Some("abc"));
        store.put_raw_item(&item).unwrap();
        item.status = RawItemStatus::Normalized;
        store.put_raw_item(&item).unwrap();
        let all = store
            .list_new_raw_items(&NewItemFilter::default())
            .unwrap();
        assert!(all.is_empty(), "item should no longer be NEW after status update");
    }

    #[test]
    fn list_new_raw_items_excludes_suppressed() {
        let store = InMemoryStore::new();
        let mut item = make_raw_item("raw-1", "s1", Some("abc"));
        store.put_raw_item(&item).unwrap();
        item.suppression_status = SuppressionStatus::Suppressed;
        store.put_raw_item(&item).unwrap();
        let all = store.list_new_raw_items(&NewItemFilter::default()).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn list_new_raw_items_filters_by_source_and_tier() {
        let store = InMemoryStore::new();
        store.put_raw_item(&make_raw_item("raw-1", "s1", Some("a"))).unwrap();
        let mut low_tier = make_raw_item("raw-2", "s2", Some("b"));
        low_tier.tier = Tier::Local;
        store.put_raw_item(&low_tier).unwrap();

        let by_source = NewItemFilter {
            source_id: Some("s1".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list_new_raw_items(&by_source).unwrap().len(), 1);

        let by_tier = NewItemFilter {
            min_tier: Some(Tier::Regional),
            ..Default::default()
        };
        assert_eq!(store.list_new_raw_items(&by_tier).unwrap().len(), 1);
    }
}
