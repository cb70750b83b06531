//! Shared data model: the five durable record types the agent produces,
//! plus the reference-data shapes (`Facility`, `Lane`, `Shipment`) they
//! link against.

pub mod alert;
pub mod event;
pub mod raw_item;
pub mod source_run;

pub use alert::{
    Alert, AlertDiagnostics, AlertEvidence, AlertImpactAssessment, AlertScope, AlertStatus, CorrelationAction,
    IncidentEvidenceRef, LastUpdater,
};
pub use event::{Event, EventType, LinkedNetwork};
pub use raw_item::{RawItem, RawItemStatus};
pub use source_run::{RunOutcome, RunPhase, SourceRun};

use serde::{Deserialize, Serialize};

/// Source tier, per spec.md's glossary: influences trust-tier defaults and
/// briefing grouping. Serializes lowercase to match spec.md §3's literal
/// `{global,regional,local,unknown}` vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Global,
    Regional,
    Local,
    Unknown,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Global => "global",
            Tier::Regional => "regional",
            Tier::Local => "local",
            Tier::Unknown => "unknown",
        }
    }

    /// Ordinal used by `min_tier` filters (fetch/ingest CLI scoping):
    /// broader-reach tiers rank higher.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Global => 3,
            Tier::Regional => 2,
            Tier::Local => 1,
            Tier::Unknown => 0,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Unknown
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FacilityType {
    Plant,
    Dc,
    Port,
    Other,
}

impl FacilityType {
    /// Tie-break priority used by the entity linker: higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            FacilityType::Plant => 3,
            FacilityType::Dc => 2,
            FacilityType::Port => 1,
            FacilityType::Other => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    pub facility_id: String,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub facility_type: FacilityType,
    pub criticality_score: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaneMatchType {
    Origin,
    Destination,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lane {
    pub lane_id: String,
    pub origin_facility_id: String,
    pub destination_facility_id: String,
    pub volume_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub shipment_id: String,
    pub lane_id: String,
    pub priority_flag: bool,
    pub eta_date: Option<String>,
}
