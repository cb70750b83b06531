//! `Event` — a normalized, network-linked occurrence derived from a
//! [`crate::models::raw_item::RawItem`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Tier;
use crate::suppression::SuppressionResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Weather,
    Spill,
    Strike,
    Closure,
    Reg,
    Recall,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Weather => "WEATHER",
            EventType::Spill => "SPILL",
            EventType::Strike => "STRIKE",
            EventType::Closure => "CLOSURE",
            EventType::Reg => "REG",
            EventType::Recall => "RECALL",
            EventType::Other => "OTHER",
        }
    }
}

/// Linked facility/lane/shipment scope attached by [`crate::linker`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkedNetwork {
    pub facility_ids: Vec<String>,
    pub lane_ids: Vec<String>,
    pub shipment_ids: Vec<String>,
    pub link_confidence: f64,
    pub link_provenance: String,
    pub shipments_total_linked: usize,
    pub shipments_truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub source_id: String,
    pub raw_item_id: Option<String>,
    pub event_type: EventType,
    pub title: String,
    pub raw_text: String,
    pub location_hint: Option<String>,
    pub occurred_at_utc: String,
    pub ingested_at_utc: String,
    pub tier: Tier,
    pub trust_tier: u8,
    pub classification_floor: u8,
    pub weighting_bias: i32,
    pub payload: Value,
    pub network: LinkedNetwork,
    pub suppressed: bool,
    pub suppression: Option<SuppressionResult>,
}
