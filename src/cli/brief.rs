//! `brief.v1` read model, per spec.md §6. Rendering (markdown, tables) is
//! an external collaborator; this module only builds the data shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::alert::{Alert, CorrelationAction};
use crate::store::Store;

pub const READ_MODEL_VERSION: &str = "brief.v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BriefCounts {
    pub new: usize,
    pub updated: usize,
    pub impactful: usize,
    pub relevant: usize,
    pub interesting: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuppressedByBucket {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuppressedCounts {
    pub count: usize,
    pub by_rule: Vec<SuppressedByBucket>,
    pub by_source: Vec<SuppressedByBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BriefReadModel {
    pub read_model_version: String,
    pub window: BriefWindow,
    pub counts: BriefCounts,
    pub tier_counts: HashMap<String, usize>,
    pub top: Vec<Alert>,
    pub updated: Vec<Alert>,
    pub created: Vec<Alert>,
    pub suppressed: SuppressedCounts,
    /// Flat count kept alongside `suppressed.count` for callers still
    /// reading the pre-`brief.v1` shape.
    pub suppressed_legacy: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BriefWindow {
    pub since_utc: String,
    pub since_hours: i64,
}

fn sort_key(alert: &Alert) -> (std::cmp::Reverse<u8>, std::cmp::Reverse<u8>, std::cmp::Reverse<u32>, std::cmp::Reverse<String>) {
    (
        std::cmp::Reverse(alert.classification),
        std::cmp::Reverse(alert.impact.score),
        std::cmp::Reverse(alert.update_count),
        std::cmp::Reverse(alert.last_seen_utc.clone()),
    )
}

fn sorted(mut alerts: Vec<Alert>) -> Vec<Alert> {
    alerts.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    alerts
}

fn bucket_counts(items: impl Iterator<Item = String>) -> Vec<SuppressedByBucket> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in items {
        *counts.entry(key).or_default() += 1;
    }
    let mut buckets: Vec<SuppressedByBucket> = counts.into_iter().map(|(key, count)| SuppressedByBucket { key, count }).collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    buckets
}

/// Builds the brief read model over the alerts whose `last_seen_utc` falls
/// within `[since_utc, now]`, plus suppression counts derived from events
/// in the same window.
pub fn build_brief(store: &dyn Store, since_utc: &str, since_hours: i64, top_n: usize) -> Result<BriefReadModel, crate::store::StoreError> {
    let all_alerts = store.list_alerts()?;
    let in_window: Vec<Alert> = all_alerts.into_iter().filter(|a| a.last_seen_utc.as_str() >= since_utc).collect();

    let created: Vec<Alert> = in_window.iter().filter(|a| a.correlation_action == CorrelationAction::Created).cloned().collect();
    let updated: Vec<Alert> = in_window.iter().filter(|a| a.correlation_action == CorrelationAction::Updated).cloned().collect();

    let counts = BriefCounts {
        new: created.len(),
        updated: updated.len(),
        impactful: in_window.iter().filter(|a| a.classification == 2).count(),
        relevant: in_window.iter().filter(|a| a.classification == 1).count(),
        interesting: in_window.iter().filter(|a| a.classification == 0).count(),
    };

    let mut tier_counts: HashMap<String, usize> = HashMap::new();
    for alert in &in_window {
        *tier_counts.entry(alert.last_updater.tier.as_str().to_string()).or_default() += 1;
    }

    let top: Vec<Alert> = sorted(in_window.clone()).into_iter().take(top_n).collect();
    let created = sorted(created);
    let updated = sorted(updated);

    let events: Vec<crate::models::Event> = store.list_events_since(since_utc)?;
    let suppressed_events: Vec<&crate::models::Event> = events.iter().filter(|e| e.suppressed).collect();
    let by_rule = bucket_counts(suppressed_events.iter().map(|e| {
        e.suppression.as_ref().and_then(|s| s.primary_rule_id.clone()).unwrap_or_else(|| "unknown".to_string())
    }));
    let by_source = bucket_counts(suppressed_events.iter().map(|e| e.source_id.clone()));

    Ok(BriefReadModel {
        read_model_version: READ_MODEL_VERSION.to_string(),
        window: BriefWindow { since_utc: since_utc.to_string(), since_hours },
        counts,
        tier_counts,
        top,
        updated,
        created,
        suppressed: SuppressedCounts { count: suppressed_events.len(), by_rule, by_source },
        suppressed_legacy: suppressed_events.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::{AlertDiagnostics, AlertEvidence, AlertImpactAssessment, AlertScope, AlertStatus, LastUpdater};
    use crate::models::Tier;
    use crate::store::InMemoryStore;

    fn alert(id: &str, classification: u8, action: CorrelationAction, last_seen: &str) -> Alert {
        Alert {
            alert_id: id.to_string(),
            classification,
            status: AlertStatus::Open,
            risk_type: "SPILL".to_string(),
            summary: "s".to_string(),
            root_event_id: "EVT-1".to_string(),
            root_event_ids: vec!["EVT-1".to_string()],
            correlation_key: "SPILL|PLANT-01|NONE".to_string(),
            correlation_action: action,
            first_seen_utc: last_seen.to_string(),
            last_seen_utc: last_seen.to_string(),
            update_count: 0,
            impact: AlertImpactAssessment { score: classification * 3, breakdown: vec![], classification },
            scope: AlertScope {
                facility_ids: vec![],
                lane_ids: vec![],
                shipment_ids: vec![],
                shipments_total_linked: 0,
                shipments_truncated: false,
            },
            last_updater: LastUpdater { tier: Tier::Regional, source_id: "s1".to_string(), trust_tier: 2 },
            reasoning: "".to_string(),
            recommended_actions: vec![],
            evidence: AlertEvidence {
                diagnostics: AlertDiagnostics::default(),
                linking_notes: vec![],
                correlation_key: "SPILL|PLANT-01|NONE".to_string(),
                source_ids: vec!["s1".to_string()],
                incident_evidence: None,
            },
            model_version: "hardstop-v1".to_string(),
            confidence_score: None,
        }
    }

    #[test]
    fn top_sorts_by_classification_then_impact_then_recency() {
        let store = InMemoryStore::new();
        store.put_alert(&alert("A", 0, CorrelationAction::Created, "2026-07-28T01:00:00Z")).unwrap();
        store.put_alert(&alert("B", 2, CorrelationAction::Created, "2026-07-28T00:00:00Z")).unwrap();
        store.put_alert(&alert("C", 1, CorrelationAction::Created, "2026-07-28T02:00:00Z")).unwrap();

        let brief = build_brief(&store, "2026-07-27T00:00:00Z", 24, 10).unwrap();
        assert_eq!(brief.top.iter().map(|a| a.alert_id.clone()).collect::<Vec<_>>(), vec!["B", "C", "A"]);
        assert_eq!(brief.counts.impactful, 1);
        assert_eq!(brief.counts.new, 3);
    }

    #[test]
    fn window_excludes_alerts_before_since_utc() {
        let store = InMemoryStore::new();
        store.put_alert(&alert("OLD", 2, CorrelationAction::Created, "2026-07-20T00:00:00Z")).unwrap();
        let brief = build_brief(&store, "2026-07-27T00:00:00Z", 24, 10).unwrap();
        assert!(brief.top.is_empty());
    }
}
