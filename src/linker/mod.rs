//! Entity linker: resolves an [`Event`] to facilities/lanes/shipments with
//! a confidence score and provenance tag, per spec.md §4.6.
//!
//! Grounded in `hardstop/parsing/network_linker.py::link_event_to_network`:
//! the five-stage priority ladder (first non-empty wins), the
//! criticality/type tie-break for ambiguous city/state hits, and the
//! priority/ETA shipment sort that must never be re-alphabetized.

use crate::models::{Event, Facility, FacilityType, Lane, LaneMatchType, LinkedNetwork, Shipment};

const FACILITY_ID_EXACT: &str = "FACILITY_ID_EXACT";
const FACILITY_NAME_SUBSTRING: &str = "FACILITY_NAME_SUBSTRING";
const CITY_STATE: &str = "CITY_STATE";
const CITY_STATE_WITH_SIGNAL: &str = "CITY_STATE_WITH_SIGNAL";
const CITY_STATE_AMBIGUOUS: &str = "CITY_STATE_AMBIGUOUS";
const FACILITY_RELATION: &str = "FACILITY_RELATION";
const LANE_RELATION: &str = "LANE_RELATION";

/// Default cap on linked shipments, per spec.md §4.6.
pub const DEFAULT_MAX_SHIPMENTS: usize = 50;

/// Result of linking one event: the network scope plus human-readable
/// linking notes (non-decisional evidence, surfaced on `AlertEvidence`).
pub struct LinkOutcome {
    pub network: LinkedNetwork,
    pub linking_notes: Vec<String>,
}

fn combined_text(event: &Event) -> String {
    let hint = event.location_hint.as_deref().unwrap_or("");
    format!("{} {} {}", event.title, event.raw_text, hint)
}

fn facility_tie_break_key(facility: &Facility) -> (i32, i32) {
    (-(facility.criticality_score as i32), -(facility.facility_type.priority() as i32))
}

/// Stage result: the matched facilities plus the confidence/provenance the
/// stage contributes to the overall link.
struct FacilityMatch {
    facilities: Vec<Facility>,
    confidence: f64,
    provenance: &'static str,
}

fn match_facility_id_exact(text: &str, facilities: &[Facility]) -> Option<FacilityMatch> {
    let hits: Vec<Facility> = facilities.iter().filter(|f| text.contains(&f.facility_id)).cloned().collect();
    if hits.is_empty() {
        None
    } else {
        Some(FacilityMatch {
            facilities: hits,
            confidence: 0.95,
            provenance: FACILITY_ID_EXACT,
        })
    }
}

fn match_facility_name_substring(text: &str, facilities: &[Facility]) -> Option<FacilityMatch> {
    let lowered = text.to_lowercase();
    let hits: Vec<Facility> = facilities
        .iter()
        .filter(|f| !f.name.is_empty() && lowered.contains(&f.name.to_lowercase()))
        .cloned()
        .collect();
    if hits.is_empty() {
        None
    } else {
        Some(FacilityMatch {
            facilities: hits,
            confidence: 0.85,
            provenance: FACILITY_NAME_SUBSTRING,
        })
    }
}

/// Parses an event's `location_hint` as `"City, ST"` and finds facilities
/// whose (city, state) match case-insensitively; disambiguates multi-hit
/// results via a second textual signal, falling back to the
/// criticality/type tie-break.
fn match_city_state(text: &str, location_hint: Option<&str>, facilities: &[Facility]) -> Option<FacilityMatch> {
    let hint = location_hint?;
    let (city, state) = hint.split_once(',')?;
    let city = city.trim().to_lowercase();
    let state = state.trim().to_lowercase();
    if city.is_empty() || state.is_empty() {
        return None;
    }

    let mut hits: Vec<Facility> = facilities
        .iter()
        .filter(|f| {
            f.city.as_deref().map(|c| c.to_lowercase()) == Some(city.clone())
                && f.state.as_deref().map(|s| s.to_lowercase()) == Some(state.clone())
        })
        .cloned()
        .collect();

    match hits.len() {
        0 => None,
        1 => Some(FacilityMatch {
            facilities: hits,
            confidence: 0.70,
            provenance: CITY_STATE,
        }),
        _ => {
            let lowered_text = text.to_lowercase();
            let signaled: Vec<Facility> = hits
                .iter()
                .filter(|f| text.contains(&f.facility_id) || lowered_text.contains(&f.name.to_lowercase()))
                .cloned()
                .collect();
            if !signaled.is_empty() {
                Some(FacilityMatch {
                    facilities: signaled,
                    confidence: 0.70,
                    provenance: CITY_STATE_WITH_SIGNAL,
                })
            } else {
                hits.sort_by_key(facility_tie_break_key);
                hits.truncate(1);
                Some(FacilityMatch {
                    facilities: hits,
                    confidence: 0.45,
                    provenance: CITY_STATE_AMBIGUOUS,
                })
            }
        }
    }
}

fn lane_match_type(lane: &Lane, facility_ids: &[String]) -> Option<LaneMatchType> {
    let origin = facility_ids.iter().any(|id| id == &lane.origin_facility_id);
    let dest = facility_ids.iter().any(|id| id == &lane.destination_facility_id);
    match (origin, dest) {
        (true, true) => Some(LaneMatchType::Both),
        (true, false) => Some(LaneMatchType::Origin),
        (false, true) => Some(LaneMatchType::Destination),
        (false, false) => None,
    }
}

fn far_future_eta() -> &'static str {
    "9999-12-31"
}

fn shipment_sort_key(shipment: &Shipment) -> (std::cmp::Reverse<bool>, String) {
    let eta = shipment.eta_date.clone().unwrap_or_else(|| far_future_eta().to_string());
    (std::cmp::Reverse(shipment.priority_flag), eta)
}

/// Links an event to the facility/lane/shipment reference data, in the
/// five-stage priority order: first non-empty stage wins, later stages are
/// never attempted.
pub fn link_event_to_network(
    event: &Event,
    facilities: &[Facility],
    lanes: &[Lane],
    shipments: &[Shipment],
    max_shipments: usize,
) -> LinkOutcome {
    let text = combined_text(event);
    let mut notes = Vec::new();

    let facility_match = match_facility_id_exact(&text, facilities)
        .or_else(|| match_facility_name_substring(&text, facilities))
        .or_else(|| match_city_state(&text, event.location_hint.as_deref(), facilities));

    let Some(facility_match) = facility_match else {
        notes.push("no facility match".to_string());
        return LinkOutcome {
            network: LinkedNetwork::default(),
            linking_notes: notes,
        };
    };

    let facility_ids: Vec<String> = facility_match.facilities.iter().map(|f| f.facility_id.clone()).collect();
    notes.push(format!(
        "matched {} facilit{} via {}",
        facility_ids.len(),
        if facility_ids.len() == 1 { "y" } else { "ies" },
        facility_match.provenance
    ));

    let matched_lanes: Vec<&Lane> = lanes
        .iter()
        .filter(|lane| lane_match_type(lane, &facility_ids).is_some())
        .collect();
    let lane_ids: Vec<String> = matched_lanes.iter().map(|l| l.lane_id.clone()).collect();
    if !lane_ids.is_empty() {
        notes.push(format!("matched {} lane(s) via {FACILITY_RELATION}", lane_ids.len()));
    }

    let mut matched_shipments: Vec<Shipment> = shipments
        .iter()
        .filter(|s| lane_ids.contains(&s.lane_id))
        .cloned()
        .collect();
    matched_shipments.sort_by_key(shipment_sort_key);
    let shipments_total_linked = matched_shipments.len();
    let shipments_truncated = shipments_total_linked > max_shipments;
    matched_shipments.truncate(max_shipments);
    if shipments_total_linked > 0 {
        notes.push(format!(
            "linked {shipments_total_linked} shipment(s) via {LANE_RELATION}{}",
            if shipments_truncated { ", truncated" } else { "" }
        ));
    }
    let shipment_ids: Vec<String> = matched_shipments.iter().map(|s| s.shipment_id.clone()).collect();

    let network = LinkedNetwork {
        facility_ids,
        lane_ids,
        shipment_ids,
        link_confidence: facility_match.confidence,
        link_provenance: facility_match.provenance.to_string(),
        shipments_total_linked,
        shipments_truncated,
    };

    LinkOutcome {
        network,
        linking_notes: notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, Tier};

    fn facility(id: &str, name: &str, city: &str, state: &str, criticality: u8, kind: FacilityType) -> Facility {
        Facility {
            facility_id: id.to_string(),
            name: name.to_string(),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            facility_type: kind,
            criticality_score: criticality,
        }
    }

    fn lane(id: &str, origin: &str, dest: &str, volume: u8) -> Lane {
        Lane {
            lane_id: id.to_string(),
            origin_facility_id: origin.to_string(),
            destination_facility_id: dest.to_string(),
            volume_score: volume,
        }
    }

    fn shipment(id: &str, lane_id: &str, priority: bool, eta: Option<&str>) -> Shipment {
        Shipment {
            shipment_id: id.to_string(),
            lane_id: lane_id.to_string(),
            priority_flag: priority,
            eta_date: eta.map(str::to_string),
        }
    }

    fn event(title: &str, raw_text: &str, location_hint: Option<&str>) -> Event {
        Event {
            event_id: "EVT-20260728-aaaaaaaa".to_string(),
            source_id: "s1".to_string(),
            raw_item_id: None,
            event_type: EventType::Spill,
            title: title.to_string(),
            raw_text: raw_text.to_string(),
            location_hint: location_hint.map(str::to_string),
            occurred_at_utc: "2026-07-28T00:00:00Z".to_string(),
            ingested_at_utc: "2026-07-28T00:00:00Z".to_string(),
            tier: Tier::Regional,
            trust_tier: 2,
            classification_floor: 0,
            weighting_bias: 0,
            payload: serde_json::json!({}),
            network: LinkedNetwork::default(),
            suppressed: false,
            suppression: None,
        }
    }

    #[test]
    fn exact_facility_id_wins_over_everything_else() {
        let facilities = vec![facility("PLANT-01", "Riverside Plant", "Houston", "TX", 9, FacilityType::Plant)];
        let e = event("Incident at PLANT-01 reported", "", Some("Houston, TX"));
        let outcome = link_event_to_network(&e, &facilities, &[], &[], DEFAULT_MAX_SHIPMENTS);
        assert_eq!(outcome.network.facility_ids, vec!["PLANT-01"]);
        assert_eq!(outcome.network.link_provenance, FACILITY_ID_EXACT);
        assert_eq!(outcome.network.link_confidence, 0.95);
    }

    #[test]
    fn ambiguous_city_state_falls_back_to_tie_break() {
        let facilities = vec![
            facility("PLANT-A", "Alpha", "Houston", "TX", 5, FacilityType::Dc),
            facility("PLANT-B", "Beta", "Houston", "TX", 9, FacilityType::Plant),
        ];
        let e = event("Flooding reported", "", Some("Houston, TX"));
        let outcome = link_event_to_network(&e, &facilities, &[], &[], DEFAULT_MAX_SHIPMENTS);
        assert_eq!(outcome.network.facility_ids, vec!["PLANT-B"]);
        assert_eq!(outcome.network.link_provenance, CITY_STATE_AMBIGUOUS);
        assert_eq!(outcome.network.link_confidence, 0.45);
    }

    #[test]
    fn ambiguous_city_state_resolved_by_second_signal() {
        let facilities = vec![
            facility("PLANT-A", "Alpha", "Houston", "TX", 5, FacilityType::Dc),
            facility("PLANT-B", "Beta", "Houston", "TX", 9, FacilityType::Plant),
        ];
        let e = event("Flooding reported near Alpha site", "", Some("Houston, TX"));
        let outcome = link_event_to_network(&e, &facilities, &[], &[], DEFAULT_MAX_SHIPMENTS);
        assert_eq!(outcome.network.facility_ids, vec!["PLANT-A"]);
        assert_eq!(outcome.network.link_provenance, CITY_STATE_WITH_SIGNAL);
    }

    #[test]
    fn shipments_preserve_priority_then_eta_order_and_truncate() {
        let facilities = vec![facility("PLANT-01", "Riverside Plant", "Houston", "TX", 9, FacilityType::Plant)];
        let lanes = vec![lane("LANE-1", "PLANT-01", "DC-1", 8)];
        let shipments = vec![
            shipment("S1", "LANE-1", false, Some("2026-08-01")),
            shipment("S2", "LANE-1", true, Some("2026-08-05")),
            shipment("S3", "LANE-1", true, Some("2026-07-30")),
            shipment("S4", "LANE-1", false, None),
        ];
        let e = event("Incident at PLANT-01 reported", "", None);
        let outcome = link_event_to_network(&e, &facilities, &lanes, &shipments, 2);
        assert_eq!(outcome.network.shipment_ids, vec!["S3", "S2"]);
        assert_eq!(outcome.network.shipments_total_linked, 4);
        assert!(outcome.network.shipments_truncated);
    }

    #[test]
    fn no_facility_match_yields_empty_network() {
        let e = event("Quarterly earnings", "", None);
        let outcome = link_event_to_network(&e, &[], &[], &[], DEFAULT_MAX_SHIPMENTS);
        assert!(outcome.network.facility_ids.is_empty());
        assert_eq!(outcome.network.link_confidence, 0.0);
    }
}
