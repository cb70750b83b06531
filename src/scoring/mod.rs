//! Impact scorer and classifier: a deterministic ordered accumulator
//! producing `{score, breakdown}`, then a score→classification map with a
//! classification-floor override, per spec.md §4.7.
//!
//! Grounded in `hardstop/alerts/impact_scorer.py`: rule order, weights, and
//! the `[-7d, +48h]` ETA-window check for "near-term" priority shipments.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{AlertImpactAssessment, Event, EventType, Facility, Lane, Shipment};
use crate::time_utils::{is_eta_within_window, parse_eta_date_safely};

const SCORE_MIN: u8 = 0;
const SCORE_MAX: u8 = 10;

fn combined_text(event: &Event) -> String {
    format!("{} {}", event.title, event.raw_text)
}

/// Rule 1: first facility at or above criticality 7 contributes +2.
fn score_facility_criticality(event: &Event, facilities: &[Facility], breakdown: &mut Vec<String>) -> i32 {
    let hit = event
        .network
        .facility_ids
        .iter()
        .filter_map(|id| facilities.iter().find(|f| &f.facility_id == id))
        .find(|f| f.criticality_score >= 7);
    match hit {
        Some(facility) => {
            breakdown.push(format!("facility {} criticality {} >= 7: +2", facility.facility_id, facility.criticality_score));
            2
        }
        None => 0,
    }
}

/// Rule 2: first lane at or above volume 7 contributes +1.
fn score_lane_volume(event: &Event, lanes: &[Lane], breakdown: &mut Vec<String>) -> i32 {
    let hit = event
        .network
        .lane_ids
        .iter()
        .filter_map(|id| lanes.iter().find(|l| &l.lane_id == id))
        .find(|l| l.volume_score >= 7);
    match hit {
        Some(lane) => {
            breakdown.push(format!("lane {} volume {} >= 7: +1", lane.lane_id, lane.volume_score));
            1
        }
        None => 0,
    }
}

/// Rule 3: priority-shipment volume and near-term ETA bonuses.
fn score_priority_shipments(
    event: &Event,
    shipments: &[Shipment],
    now: DateTime<Utc>,
    breakdown: &mut Vec<String>,
) -> i32 {
    let linked: Vec<&Shipment> = event
        .network
        .shipment_ids
        .iter()
        .filter_map(|id| shipments.iter().find(|s| &s.shipment_id == id))
        .collect();
    let priority_count = linked.iter().filter(|s| s.priority_flag).count();
    let mut total = 0;

    if priority_count > 0 {
        breakdown.push(format!("{priority_count} priority shipment(s): +1"));
        total += 1;
        if priority_count >= 5 {
            breakdown.push(format!("{priority_count} priority shipments >= 5: +1"));
            total += 1;
        }
        let near_term = linked.iter().filter(|s| s.priority_flag).any(|s| {
            s.eta_date
                .as_deref()
                .and_then(parse_eta_date_safely)
                .map(|eta| is_eta_within_window(eta, now))
                .unwrap_or(false)
        });
        if near_term {
            breakdown.push("priority shipment ETA within [-7d,+48h]: +1".to_string());
            total += 1;
        }
    }

    if linked.len() >= 10 {
        breakdown.push(format!("{} linked shipments >= 10: +1", linked.len()));
        total += 1;
    }

    total
}

/// Rule 4: high-risk event types score a flat bonus; everything else falls
/// through to a weighted keyword scan.
fn score_event_type_or_keywords(event: &Event, keyword_weights: &HashMap<String, i32>, breakdown: &mut Vec<String>) -> i32 {
    if matches!(event.event_type, EventType::Spill | EventType::Strike | EventType::Closure) {
        breakdown.push(format!("event_type {} is high-risk: +1", event.event_type.as_str()));
        return 1;
    }

    let text = combined_text(event).to_lowercase();
    let mut matched: Vec<(&String, &i32)> = keyword_weights.iter().filter(|(k, _)| text.contains(k.as_str())).collect();
    matched.sort_by(|a, b| a.0.cmp(b.0));
    let sum: i32 = matched.iter().map(|(_, w)| **w).sum();
    if sum != 0 {
        let keywords: Vec<&str> = matched.iter().map(|(k, _)| k.as_str()).collect();
        breakdown.push(format!("keyword match [{}]: +{sum}", keywords.join(",")));
    }
    sum
}

/// Rule 5: trust-tier adjustment.
fn score_trust_tier(event: &Event, breakdown: &mut Vec<String>) -> i32 {
    match event.trust_tier {
        3 => {
            breakdown.push("trust_tier 3: +1".to_string());
            1
        }
        1 => {
            breakdown.push("trust_tier 1: -1".to_string());
            -1
        }
        _ => 0,
    }
}

/// Rule 6: the source's configured weighting bias, applied verbatim.
fn score_weighting_bias(event: &Event, breakdown: &mut Vec<String>) -> i32 {
    if event.weighting_bias != 0 {
        breakdown.push(format!("weighting_bias: {:+}", event.weighting_bias));
    }
    event.weighting_bias
}

/// Runs the full ordered rule accumulator and classifies the result,
/// applying the source's `classification_floor`.
pub fn score_and_classify(
    event: &Event,
    facilities: &[Facility],
    lanes: &[Lane],
    shipments: &[Shipment],
    keyword_weights: &HashMap<String, i32>,
    now: DateTime<Utc>,
) -> AlertImpactAssessment {
    let mut breakdown = Vec::new();
    let mut raw_score = 0;

    raw_score += score_facility_criticality(event, facilities, &mut breakdown);
    raw_score += score_lane_volume(event, lanes, &mut breakdown);
    raw_score += score_priority_shipments(event, shipments, now, &mut breakdown);
    raw_score += score_event_type_or_keywords(event, keyword_weights, &mut breakdown);
    raw_score += score_trust_tier(event, &mut breakdown);
    raw_score += score_weighting_bias(event, &mut breakdown);

    let clamped = raw_score.clamp(SCORE_MIN as i32, SCORE_MAX as i32);
    if clamped != raw_score {
        breakdown.push(format!("Capped at {clamped} (raw {raw_score})"));
    }
    let score = clamped as u8;

    let mut classification = match score {
        0..=1 => 0,
        2..=3 => 1,
        _ => 2,
    };
    if event.classification_floor > classification {
        classification = event.classification_floor;
        breakdown.push(format!("Classification floor: raised to {classification}"));
    }

    AlertImpactAssessment {
        score,
        breakdown,
        classification,
    }
}
