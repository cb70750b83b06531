//! IncidentEvidence: the non-decisional artifact explaining why a
//! correlation merge happened, plus its replay operator, per spec.md
//! §4.8/§4.10.
//!
//! Grounded in `hardstop/output/incidents/evidence.py`: reasons are derived
//! deterministically from scope overlap and a temporal-window check, never
//! from free-text judgment.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifacts::{artifact_hash, ArtifactError};
use crate::models::alert::Alert;
use crate::models::event::Event;
use crate::time_utils::parse_z;

pub const ARTIFACT_VERSION: &str = "incident-evidence.v1";
pub const KIND: &str = "IncidentEvidence";

pub const REASON_CORRELATION_KEY_MATCH: &str = "CORRELATION_KEY_MATCH";
pub const REASON_TEMPORAL_OVERLAP: &str = "TEMPORAL_OVERLAP";
pub const REASON_SHARED_FACILITIES: &str = "SHARED_FACILITIES";
pub const REASON_SHARED_LANES: &str = "SHARED_LANES";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeReason {
    pub code: String,
    pub message: String,
    pub matched: bool,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentInputs {
    pub existing_alert_id: String,
    pub existing_alert_snapshot: Value,
    pub incoming_event_id: String,
    pub root_event_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IncidentOverlap {
    pub shared_facility_ids: Vec<String>,
    pub shared_lane_ids: Vec<String>,
    pub delta_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IncidentScopeSnapshot {
    pub facility_ids: Vec<String>,
    pub lane_ids: Vec<String>,
    pub shipment_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentEvidence {
    pub artifact_version: String,
    pub kind: String,
    pub correlation_key: String,
    pub generated_at_utc: String,
    pub inputs: IncidentInputs,
    pub merge_reasons: Vec<MergeReason>,
    pub merge_summary: Vec<String>,
    pub overlap: IncidentOverlap,
    pub scope: ScopePair,
    pub window_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopePair {
    pub existing: IncidentScopeSnapshot,
    pub incoming: IncidentScopeSnapshot,
}

fn shared_ids(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut shared: Vec<String> = existing.iter().filter(|id| incoming.contains(id)).cloned().collect();
    shared.sort();
    shared.dedup();
    shared
}

/// Builds the IncidentEvidence for a correlation hit. `window_hours` is the
/// temporal-overlap threshold used by [`REASON_TEMPORAL_OVERLAP`].
pub fn build_incident_evidence(
    alert: &Alert,
    incoming_event: &Event,
    generated_at_utc: String,
    window_hours: f64,
) -> IncidentEvidence {
    let existing_scope = IncidentScopeSnapshot {
        facility_ids: alert.scope.facility_ids.clone(),
        lane_ids: alert.scope.lane_ids.clone(),
        shipment_ids: alert.scope.shipment_ids.clone(),
    };
    let incoming_scope = IncidentScopeSnapshot {
        facility_ids: incoming_event.network.facility_ids.clone(),
        lane_ids: incoming_event.network.lane_ids.clone(),
        shipment_ids: incoming_event.network.shipment_ids.clone(),
    };

    let shared_facilities = shared_ids(&existing_scope.facility_ids, &incoming_scope.facility_ids);
    let shared_lanes = shared_ids(&existing_scope.lane_ids, &incoming_scope.lane_ids);

    let delta_hours = match (parse_z(&alert.last_seen_utc), parse_z(&incoming_event.occurred_at_utc)) {
        (Some(existing_ts), Some(incoming_ts)) => Some((existing_ts - incoming_ts).num_seconds().abs() as f64 / 3600.0),
        _ => None,
    };
    let temporal_match = delta_hours.map(|d| d <= window_hours).unwrap_or(false);

    let mut merge_reasons = Vec::new();
    let mut merge_summary = Vec::new();

    merge_reasons.push(MergeReason {
        code: REASON_CORRELATION_KEY_MATCH.to_string(),
        message: format!("correlation_key {} matched the existing alert", alert.correlation_key),
        matched: true,
        details: serde_json::json!({ "correlation_key": alert.correlation_key }),
    });
    merge_summary.push(format!("correlation key {} matched", alert.correlation_key));

    merge_reasons.push(MergeReason {
        code: REASON_TEMPORAL_OVERLAP.to_string(),
        message: match delta_hours {
            Some(delta) => format!("event occurred {delta:.1}h from the alert's last_seen_utc (window {window_hours}h)"),
            None => "timestamps could not be compared".to_string(),
        },
        matched: temporal_match,
        details: serde_json::json!({ "delta_hours": delta_hours, "window_hours": window_hours }),
    });
    if temporal_match {
        merge_summary.push("within temporal window".to_string());
    }

    merge_reasons.push(MergeReason {
        code: REASON_SHARED_FACILITIES.to_string(),
        message: format!("{} shared facility id(s)", shared_facilities.len()),
        matched: !shared_facilities.is_empty(),
        details: serde_json::json!({ "facility_ids": shared_facilities }),
    });
    if !shared_facilities.is_empty() {
        merge_summary.push(format!("shared facilities: {}", shared_facilities.join(",")));
    }

    merge_reasons.push(MergeReason {
        code: REASON_SHARED_LANES.to_string(),
        message: format!("{} shared lane id(s)", shared_lanes.len()),
        matched: !shared_lanes.is_empty(),
        details: serde_json::json!({ "lane_ids": shared_lanes }),
    });
    if !shared_lanes.is_empty() {
        merge_summary.push(format!("shared lanes: {}", shared_lanes.join(",")));
    }

    let mut root_event_ids = alert.root_event_ids.clone();
    root_event_ids.push(incoming_event.event_id.clone());
    root_event_ids.sort();
    root_event_ids.dedup();

    IncidentEvidence {
        artifact_version: ARTIFACT_VERSION.to_string(),
        kind: KIND.to_string(),
        correlation_key: alert.correlation_key.clone(),
        generated_at_utc,
        inputs: IncidentInputs {
            existing_alert_id: alert.alert_id.clone(),
            existing_alert_snapshot: serde_json::to_value(alert).unwrap_or(Value::Null),
            incoming_event_id: incoming_event.event_id.clone(),
            root_event_ids,
        },
        merge_reasons,
        merge_summary,
        overlap: IncidentOverlap {
            shared_facility_ids: shared_facilities,
            shared_lane_ids: shared_lanes,
            delta_hours,
        },
        scope: ScopePair { existing: existing_scope, incoming: incoming_scope },
        window_hours,
        artifact_hash: None,
    }
}

fn slugify(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Computes the artifact hash, writes the evidence to
/// `output_dir/incidents/<alert>__<event>__<key-slug>.json`, and returns the
/// hashed evidence plus the path written.
pub fn persist_incident_evidence(
    output_dir: impl AsRef<std::path::Path>,
    mut evidence: IncidentEvidence,
) -> Result<(IncidentEvidence, std::path::PathBuf), ArtifactError> {
    evidence.artifact_hash = None;
    let hash = artifact_hash(&evidence)?;
    evidence.artifact_hash = Some(hash);

    let dir = output_dir.as_ref().join("incidents");
    std::fs::create_dir_all(&dir).map_err(|e| ArtifactError::Io(e.to_string()))?;
    let filename = format!(
        "{}__{}__{}.json",
        evidence.inputs.existing_alert_id,
        evidence.inputs.incoming_event_id,
        slugify(&evidence.correlation_key)
    );
    let path = dir.join(filename);
    let body = serde_json::to_string_pretty(&evidence).map_err(|e| ArtifactError::Serialization(e.to_string()))?;
    std::fs::write(&path, body).map_err(|e| ArtifactError::Io(e.to_string()))?;
    Ok((evidence, path))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayIssue {
    ArtifactMissing(String),
    HashMismatch { stored: String, recomputed: String },
    NoReferencingRunRecord,
    ConfigHashMismatch { record_hash: String, current_hash: String },
}

/// Re-derives an artifact's hash and compares it to the stored value; and,
/// given the RunRecord that referenced it, compares config hashes. Returns
/// any mismatches found — callers decide whether to treat them as warnings
/// (best-effort) or errors (strict), per spec.md §4.10.
pub fn replay_check(
    stored: &IncidentEvidence,
    referencing_run_config_hash: Option<&str>,
    current_config_hash: &str,
) -> Vec<ReplayIssue> {
    let mut issues = Vec::new();
    let mut recomputed = stored.clone();
    recomputed.artifact_hash = None;
    let recomputed_hash = match artifact_hash(&recomputed) {
        Ok(hash) => hash,
        Err(_) => {
            issues.push(ReplayIssue::ArtifactMissing(stored.inputs.existing_alert_id.clone()));
            return issues;
        }
    };
    if let Some(stored_hash) = &stored.artifact_hash {
        if stored_hash != &recomputed_hash {
            issues.push(ReplayIssue::HashMismatch { stored: stored_hash.clone(), recomputed: recomputed_hash });
        }
    }
    match referencing_run_config_hash {
        Some(record_hash) if record_hash != current_config_hash => {
            issues.push(ReplayIssue::ConfigHashMismatch {
                record_hash: record_hash.to_string(),
                current_hash: current_config_hash.to_string(),
            });
        }
        None => issues.push(ReplayIssue::NoReferencingRunRecord),
        _ => {}
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::{AlertEvidence, AlertImpactAssessment, AlertScope, AlertStatus, CorrelationAction, LastUpdater};
    use crate::models::event::{EventType, LinkedNetwork};
    use crate::models::Tier;

    fn sample_alert() -> Alert {
        Alert {
            alert_id: "ALERT-1".to_string(),
            classification: 1,
            status: AlertStatus::Open,
            risk_type: "SPILL".to_string(),
            summary: "s".to_string(),
            root_event_id: "EVT-1".to_string(),
            root_event_ids: vec!["EVT-1".to_string()],
            correlation_key: "SPILL|PLANT-01|NONE".to_string(),
            correlation_action: CorrelationAction::Created,
            first_seen_utc: "2026-07-27T12:00:00Z".to_string(),
            last_seen_utc: "2026-07-27T12:00:00Z".to_string(),
            update_count: 0,
            impact: AlertImpactAssessment { score: 1, breakdown: vec![], classification: 0 },
            scope: AlertScope {
                facility_ids: vec!["PLANT-01".to_string()],
                lane_ids: vec!["LANE-001".to_string()],
                shipment_ids: vec![],
                shipments_total_linked: 0,
                shipments_truncated: false,
            },
            last_updater: LastUpdater { tier: Tier::Regional, source_id: "s1".to_string(), trust_tier: 2 },
            reasoning: "".to_string(),
            recommended_actions: vec![],
            evidence: AlertEvidence {
                diagnostics: Default::default(),
                linking_notes: vec![],
                correlation_key: "SPILL|PLANT-01|NONE".to_string(),
                source_ids: vec!["s1".to_string()],
                incident_evidence: None,
            },
            model_version: "hardstop-v1".to_string(),
            confidence_score: None,
        }
    }

    fn incoming_event() -> Event {
        Event {
            event_id: "EVT-2".to_string(),
            source_id: "s2".to_string(),
            raw_item_id: None,
            event_type: EventType::Spill,
            title: "Second sighting".to_string(),
            raw_text: "".to_string(),
            location_hint: None,
            occurred_at_utc: "2026-07-27T14:00:00Z".to_string(),
            ingested_at_utc: "2026-07-27T14:00:00Z".to_string(),
            tier: Tier::Regional,
            trust_tier: 2,
            classification_floor: 0,
            weighting_bias: 0,
            payload: serde_json::json!({}),
            network: LinkedNetwork {
                facility_ids: vec!["PLANT-01".to_string()],
                lane_ids: vec![],
                shipment_ids: vec![],
                link_confidence: 0.95,
                link_provenance: "FACILITY_ID_EXACT".to_string(),
                shipments_total_linked: 0,
                shipments_truncated: false,
            },
            suppressed: false,
            suppression: None,
        }
    }

    #[test]
    fn detects_shared_facility_and_temporal_overlap() {
        let alert = sample_alert();
        let event = incoming_event();
        let evidence = build_incident_evidence(&alert, &event, "2026-07-27T14:00:00Z".to_string(), 24.0);
        assert!(evidence.merge_reasons.iter().any(|r| r.code == REASON_SHARED_FACILITIES && r.matched));
        assert!(evidence.merge_reasons.iter().any(|r| r.code == REASON_TEMPORAL_OVERLAP && r.matched));
        assert_eq!(evidence.overlap.shared_facility_ids, vec!["PLANT-01".to_string()]);
        assert_eq!(evidence.inputs.root_event_ids, vec!["EVT-1".to_string(), "EVT-2".to_string()]);
    }

    #[test]
    fn persist_writes_deterministic_filename() {
        let alert = sample_alert();
        let event = incoming_event();
        let evidence = build_incident_evidence(&alert, &event, "2026-07-27T14:00:00Z".to_string(), 24.0);
        let dir = tempfile::tempdir().unwrap();
        let (hashed, path) = persist_incident_evidence(dir.path(), evidence).unwrap();
        assert!(hashed.artifact_hash.is_some());
        assert_eq!(path.file_name().unwrap(), "ALERT-1__EVT-2__spill-plant-01-none.json");
    }

    #[test]
    fn replay_flags_hash_mismatch() {
        let alert = sample_alert();
        let event = incoming_event();
        let evidence = build_incident_evidence(&alert, &event, "2026-07-27T14:00:00Z".to_string(), 24.0);
        let dir = tempfile::tempdir().unwrap();
        let (mut hashed, _path) = persist_incident_evidence(dir.path(), evidence).unwrap();
        hashed.artifact_hash = Some("tampered".to_string());
        let issues = replay_check(&hashed, Some("cfg-1"), "cfg-1");
        assert!(issues.iter().any(|i| matches!(i, ReplayIssue::HashMismatch { .. })));
    }

    #[test]
    fn replay_flags_config_hash_mismatch() {
        let alert = sample_alert();
        let event = incoming_event();
        let evidence = build_incident_evidence(&alert, &event, "2026-07-27T14:00:00Z".to_string(), 24.0);
        let dir = tempfile::tempdir().unwrap();
        let (hashed, _path) = persist_incident_evidence(dir.path(), evidence).unwrap();
        let issues = replay_check(&hashed, Some("cfg-old"), "cfg-new");
        assert!(issues.iter().any(|i| matches!(i, ReplayIssue::ConfigHashMismatch { .. })));
    }
}
