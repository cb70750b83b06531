//! Normalizes a [`RawItem`] into an [`Event`]: event-type inference,
//! location-hint extraction, and trust-field injection.
//!
//! Grounded in `hardstop/parsing/normalizer.py`.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::SourceDef;
use crate::models::{Event, EventType, LinkedNetwork, RawItem};

const WEATHER_KEYWORDS: &[&str] = &[
    "hurricane", "tornado", "flood", "flooding", "blizzard", "winter storm",
    "storm surge", "wildfire", "heat wave", "severe weather", "tropical storm",
];
const SPILL_KEYWORDS: &[&str] = &["spill", "leak", "contamination", "hazmat release", "discharge"];
const STRIKE_KEYWORDS: &[&str] = &["strike", "walkout", "labor action", "picket", "work stoppage"];
const CLOSURE_KEYWORDS: &[&str] = &["closure", "closed", "shutdown", "suspended operations", "port closed"];
const REG_KEYWORDS: &[&str] = &["regulation", "sanctions", "embargo", "tariff", "executive order", "compliance"];
const RECALL_KEYWORDS: &[&str] = &["recall", "recalled", "product recall"];

fn any_keyword_matches(haystack: &str, keywords: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

/// Ordered keyword-list inference: WEATHER, SPILL, STRIKE, CLOSURE, REG,
/// RECALL, else OTHER. Order matters — the first matching category wins.
pub fn extract_event_type(title: &str, raw_text: &str) -> EventType {
    let combined = format!("{title} {raw_text}");
    if any_keyword_matches(&combined, WEATHER_KEYWORDS) {
        EventType::Weather
    } else if any_keyword_matches(&combined, SPILL_KEYWORDS) {
        EventType::Spill
    } else if any_keyword_matches(&combined, STRIKE_KEYWORDS) {
        EventType::Strike
    } else if any_keyword_matches(&combined, CLOSURE_KEYWORDS) {
        EventType::Closure
    } else if any_keyword_matches(&combined, REG_KEYWORDS) {
        EventType::Reg
    } else if any_keyword_matches(&combined, RECALL_KEYWORDS) {
        EventType::Recall
    } else {
        EventType::Other
    }
}

static CITY_STATE_RE: OnceLock<Regex> = OnceLock::new();

fn city_state_regex() -> &'static Regex {
    CITY_STATE_RE.get_or_init(|| Regex::new(r"\b([A-Z][a-zA-Z.]+(?: [A-Z][a-zA-Z.]+)*),\s*([A-Z]{2})\b").unwrap())
}

/// Location hint extraction priority: explicit `geo` metadata, then
/// adapter payload fields (`city`, `state`, `location`, `area`), then a
/// `"City, ST"` regex scan over title/raw_text.
pub fn extract_location_hint(payload: &serde_json::Value, title: &str, raw_text: &str) -> Option<String> {
    if let Some(geo) = payload.get("geo").and_then(|v| v.as_str()) {
        if !geo.is_empty() {
            return Some(geo.to_string());
        }
    }
    for field in ["location", "area", "city", "state"] {
        if let Some(value) = payload.get(field).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    for text in [title, raw_text] {
        if let Some(captures) = city_state_regex().captures(text) {
            return Some(format!("{}, {}", &captures[1], &captures[2]));
        }
    }
    None
}

/// Builds the `raw_text` used throughout the pipeline from the raw item's
/// body fields, preferring `summary` over `description` over `content`.
fn build_raw_text(item: &RawItem) -> String {
    item.best_body_text().unwrap_or("").to_string()
}

/// Normalizes an externally-ingested [`RawItem`] into an [`Event`],
/// injecting the source's trust-tier/classification-floor/weighting-bias
/// defaults. Does not assign an `event_id` or touch the store — callers
/// (the ingest runner) own both.
pub fn normalize_external_event(
    item: &RawItem,
    source: &SourceDef,
    event_id: String,
    ingested_at_utc: String,
) -> Event {
    let raw_text = build_raw_text(item);
    let event_type = extract_event_type(&item.title, &raw_text);
    let location_hint = extract_location_hint(&item.payload, &item.title, &raw_text);
    let occurred_at_utc = item
        .published_at_utc
        .clone()
        .unwrap_or_else(|| item.fetched_at_utc.clone());

    Event {
        event_id,
        source_id: item.source_id.clone(),
        raw_item_id: Some(item.raw_id.clone()),
        event_type,
        title: item.title.clone(),
        raw_text,
        location_hint,
        occurred_at_utc,
        ingested_at_utc,
        tier: source.tier,
        trust_tier: source.trust_tier,
        classification_floor: source.classification_floor,
        weighting_bias: source.weighting_bias,
        payload: item.payload.clone(),
        network: LinkedNetwork::default(),
        suppressed: false,
        suppression: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_order_prefers_weather_over_closure() {
        let event_type = extract_event_type("Hurricane forces port closure", "");
        assert_eq!(event_type, EventType::Weather);
    }

    #[test]
    fn event_type_falls_back_to_other() {
        let event_type = extract_event_type("Quarterly earnings call scheduled", "");
        assert_eq!(event_type, EventType::Other);
    }

    #[test]
    fn location_hint_prefers_geo_metadata() {
        let payload = serde_json::json!({"geo": "Houston, TX", "city": "Dallas"});
        let hint = extract_location_hint(&payload, "", "");
        assert_eq!(hint.as_deref(), Some("Houston, TX"));
    }

    #[test]
    fn location_hint_falls_back_to_regex_scan() {
        let payload = serde_json::json!({});
        let hint = extract_location_hint(&payload, "Fire reported in Tulsa, OK overnight", "");
        assert_eq!(hint.as_deref(), Some("Tulsa, OK"));
    }
}
