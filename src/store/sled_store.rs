//! `sled`-backed durable implementation of [`Store`].
//!
//! One tree per logical table, following the teacher's `AnalysisStorage`
//! pattern (`sled::Db::open` wrapped in `anyhow::Context`, big-endian
//! timestamp keys for range scans). Hardstop's tables are small enough in
//! practice that most lookups scan a tree rather than maintaining
//! secondary indexes, matching the teacher's own tradeoff.

use std::sync::Arc;

use tracing::{debug, info};

use crate::models::{Alert, Event, RawItem, RawItemStatus, SourceRun, SuppressionStatus};
use crate::store::{NewItemFilter, Store, StoreError};
use crate::time_utils::parse_z;

pub struct SledStore {
    db: Arc<sled::Db>,
    raw_items: sled::Tree,
    events: sled::Tree,
    alerts: sled::Tree,
    source_runs: sled::Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to open sled db at {}: {e}", path.as_ref().display()))?;
        let db = Arc::new(db);
        let raw_items = db.open_tree("raw_items")?;
        let events = db.open_tree("events")?;
        let alerts = db.open_tree("alerts")?;
        let source_runs = db.open_tree("source_runs")?;
        info!(path = %path.as_ref().display(), "opened sled store");
        Ok(Self {
            db,
            raw_items,
            events,
            alerts,
            source_runs,
        })
    }

    fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn de<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn tree_err(e: sled::Error) -> StoreError {
        StoreError::Backend(e.to_string())
    }

    /// Flushes all trees to disk. Exposed for callers (the CLI shell) that
    /// want a durability guarantee before exiting.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map(|_| ()).map_err(Self::tree_err)
    }
}

impl Store for SledStore {
    fn put_raw_item(&self, item: &RawItem) -> Result<(), StoreError> {
        let key = format!("{}\0{}", item.source_id, item.content_hash);
        self.raw_items.insert(key.as_bytes(), Self::ser(item)?).map_err(Self::tree_err)?;
        if let Some(canonical_id) = &item.canonical_id {
            let alias_key = format!("canon\0{}\0{}", item.source_id, canonical_id);
            self.raw_items
                .insert(alias_key.as_bytes(), item.content_hash.as_bytes())
                .map_err(Self::tree_err)?;
        }
        debug!(source_id = %item.source_id, "stored raw item");
        Ok(())
    }

    fn find_raw_item_for_dedupe(
        &self,
        source_id: &str,
        canonical_id: Option<&str>,
        content_hash: &str,
    ) -> Result<Option<RawItem>, StoreError> {
        if let Some(cid) = canonical_id {
            let alias_key = format!("canon\0{source_id}\0{cid}");
            if let Some(hash_bytes) = self.raw_items.get(alias_key.as_bytes()).map_err(Self::tree_err)? {
                let hash = String::from_utf8_lossy(&hash_bytes).to_string();
                let key = format!("{source_id}\0{hash}");
                if let Some(bytes) = self.raw_items.get(key.as_bytes()).map_err(Self::tree_err)? {
                    return Ok(Some(Self::de(&bytes)?));
                }
            }
        }
        let key = format!("{source_id}\0{content_hash}");
        match self.raw_items.get(key.as_bytes()).map_err(Self::tree_err)? {
            Some(bytes) => Ok(Some(Self::de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn touch_raw_item_fetched_at(&self, source_id: &str, dedupe_key: &str, fetched_at_utc: &str) -> Result<(), StoreError> {
        if let Some(mut item) = self.find_raw_item_for_dedupe(source_id, Some(dedupe_key), dedupe_key)? {
            item.fetched_at_utc = fetched_at_utc.to_string();
            self.put_raw_item(&item)?;
        }
        Ok(())
    }

    fn list_new_raw_items(&self, filter: &NewItemFilter) -> Result<Vec<RawItem>, StoreError> {
        let cutoff = filter
            .since_hours
            .map(|hours| chrono::Utc::now() - chrono::Duration::hours(hours));
        let mut out = Vec::new();
        for entry in self.raw_items.iter() {
            let (key, bytes) = entry.map_err(Self::tree_err)?;
            if key.starts_with(b"canon\0") {
                continue;
            }
            let item: RawItem = Self::de(&bytes)?;
            if item.status != RawItemStatus::New {
                continue;
            }
            if item.suppression_status == SuppressionStatus::Suppressed {
                continue;
            }
            if let Some(source_id) = &filter.source_id {
                if &item.source_id != source_id {
                    continue;
                }
            }
            if let Some(min_tier) = filter.min_tier {
                if item.tier.rank() < min_tier.rank() {
                    continue;
                }
            }
            if let Some(cutoff) = cutoff {
                if let Some(fetched_at) = parse_z(&item.fetched_at_utc) {
                    if fetched_at < cutoff {
                        continue;
                    }
                }
            }
            out.push(item);
        }
        out.sort_by(|a, b| a.raw_id.cmp(&b.raw_id));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn put_event(&self, event: &Event) -> Result<(), StoreError> {
        self.events
            .insert(event.event_id.as_bytes(), Self::ser(event)?)
            .map_err(Self::tree_err)?;
        Ok(())
    }

    fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        match self.events.get(event_id.as_bytes()).map_err(Self::tree_err)? {
            Some(bytes) => Ok(Some(Self::de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_events_since(&self, since_utc: &str) -> Result<Vec<Event>, StoreError> {
        let mut out = Vec::new();
        for entry in self.events.iter() {
            let (_, bytes) = entry.map_err(Self::tree_err)?;
            let event: Event = Self::de(&bytes)?;
            if event.occurred_at_utc.as_str() >= since_utc {
                out.push(event);
            }
        }
        Ok(out)
    }

    fn put_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts
            .insert(alert.alert_id.as_bytes(), Self::ser(alert)?)
            .map_err(Self::tree_err)?;
        Ok(())
    }

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        match self.alerts.get(alert_id.as_bytes()).map_err(Self::tree_err)? {
            Some(bytes) => Ok(Some(Self::de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn find_recent_alert_by_key(&self, correlation_key: &str, since_utc: &str) -> Result<Option<Alert>, StoreError> {
        let mut best: Option<Alert> = None;
        for entry in self.alerts.iter() {
            let (_, bytes) = entry.map_err(Self::tree_err)?;
            let alert: Alert = Self::de(&bytes)?;
            if alert.correlation_key == correlation_key && alert.last_seen_utc.as_str() >= since_utc {
                if best.as_ref().map(|b| alert.last_seen_utc > b.last_seen_utc).unwrap_or(true) {
                    best = Some(alert);
                }
            }
        }
        Ok(best)
    }

    fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let mut out = Vec::new();
        for entry in self.alerts.iter() {
            let (_, bytes) = entry.map_err(Self::tree_err)?;
            out.push(Self::de(&bytes)?);
        }
        Ok(out)
    }

    fn put_source_run(&self, run: &SourceRun) -> Result<(), StoreError> {
        let key = format!("{}\0{}\0{}", run.source_id, run.started_at_utc, run.run_id);
        self.source_runs.insert(key.as_bytes(), Self::ser(run)?).map_err(Self::tree_err)?;
        Ok(())
    }

    fn list_source_runs(&self, source_id: &str, limit: usize) -> Result<Vec<SourceRun>, StoreError> {
        let prefix = format!("{source_id}\0");
        let mut out = Vec::new();
        for entry in self.source_runs.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry.map_err(Self::tree_err)?;
            out.push(Self::de::<SourceRun>(&bytes)?);
        }
        out.sort_by(|a, b| b.started_at_utc.cmp(&a.started_at_utc));
        out.truncate(limit);
        Ok(out)
    }

    fn list_source_runs_for_group(&self, run_group_id: &str) -> Result<Vec<SourceRun>, StoreError> {
        let mut out = Vec::new();
        for entry in self.source_runs.iter() {
            let (_, bytes) = entry.map_err(Self::tree_err)?;
            let run: SourceRun = Self::de(&bytes)?;
            if run.run_group_id == run_group_id {
                out.push(run);
            }
        }
        Ok(out)
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}
