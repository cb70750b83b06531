//! `Alert` — a durable, correlated record surfaced to an operator.
//!
//! Mirrors the decision/evidence split of the original `HardstopAlert`:
//! `impact`/`classification` are the decision surface, `evidence` is the
//! non-decisional audit trail (diagnostics, linking notes, correlation and
//! source metadata) that lets an operator see why the decision was made
//! without it feeding back into scoring. Field names follow spec.md §3
//! directly (`status`, `correlation_action`, `risk_type`, `root_event_id`,
//! `root_event_ids_json`, last-updater provenance, `reasoning`,
//! `recommended_actions`) since spec.md is explicit about this record's
//! wire attributes.

use serde::{Deserialize, Serialize};

use crate::models::Tier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Open,
    Updated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CorrelationAction {
    Created,
    Updated,
}

/// Union-deduped set of facilities/lanes/shipments this alert's events
/// touch, preserving first-seen order (never re-sorted).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertScope {
    pub facility_ids: Vec<String>,
    pub lane_ids: Vec<String>,
    pub shipment_ids: Vec<String>,
    pub shipments_total_linked: usize,
    pub shipments_truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertImpactAssessment {
    pub score: u8,
    pub breakdown: Vec<String>,
    pub classification: u8,
}

/// Provenance of whichever event last touched this alert (the most recent
/// merge, or the founding event when `correlation_action = CREATED`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastUpdater {
    pub tier: Tier,
    pub source_id: String,
    pub trust_tier: u8,
}

/// Supplemented from `original_source`'s `AlertDiagnostics` — non-decisional
/// audit trail fields dropped by the distilled spec but present in the
/// original `hardstop/alerts/alert_models.py`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertDiagnostics {
    pub link_confidence: f64,
    pub link_provenance: String,
    pub shipments_total_linked: usize,
    pub shipments_truncated: bool,
    pub impact_score: u8,
    pub impact_score_breakdown: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentEvidenceRef {
    pub artifact_hash: String,
    pub merge_summary: Vec<String>,
}

/// Supplemented from `original_source`'s `AlertEvidence` (non-decisional):
/// `diagnostics`, `linking_notes`, `correlation`, `source`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertEvidence {
    pub diagnostics: AlertDiagnostics,
    pub linking_notes: Vec<String>,
    pub correlation_key: String,
    pub source_ids: Vec<String>,
    /// Set once an `IncidentEvidence` artifact has been written for a
    /// merge into this alert (spec.md §4.8's final bullet).
    pub incident_evidence: Option<IncidentEvidenceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub alert_id: String,
    pub classification: u8,
    pub status: AlertStatus,
    pub risk_type: String,
    pub summary: String,
    /// First contributing event; never changes after creation.
    pub root_event_id: String,
    /// Sorted, deduped set of all contributing event ids.
    pub root_event_ids: Vec<String>,
    pub correlation_key: String,
    pub correlation_action: CorrelationAction,
    pub first_seen_utc: String,
    pub last_seen_utc: String,
    pub update_count: usize,
    pub impact: AlertImpactAssessment,
    pub scope: AlertScope,
    pub last_updater: LastUpdater,
    pub reasoning: String,
    pub recommended_actions: Vec<String>,
    pub evidence: AlertEvidence,
    /// `"hardstop-v1"`, restored from the original's `model_version` field.
    pub model_version: String,
    /// Reserved for a future confidence model; always `None` today.
    pub confidence_score: Option<f64>,
}

impl Alert {
    pub fn impact_score(&self) -> u8 {
        self.impact.score
    }
}
