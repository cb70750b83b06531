//! JSON government-alert adapter (NWS `alerts/active`-style GeoJSON feed,
//! also used for IPAWS sources whose payload shares the same
//! feature/properties envelope).

use serde::Deserialize;

use crate::adapters::http::Transport;
use crate::adapters::{AdapterError, AdapterFetch, Candidate, SourceAdapter};
use crate::config::sources::SourceDef;

#[derive(Debug, Deserialize)]
struct AlertCollection {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    id: Option<String>,
    properties: AlertProperties,
}

#[derive(Debug, Deserialize)]
struct AlertProperties {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    #[serde(rename = "areaDesc")]
    area_desc: Option<String>,
    #[serde(default)]
    sent: Option<String>,
    #[serde(default)]
    web: Option<String>,
}

pub struct NwsAlertsAdapter;

impl SourceAdapter for NwsAlertsAdapter {
    fn adapter_version(&self) -> &'static str {
        "nws-alerts-adapter-1"
    }

    fn fetch(
        &self,
        transport: &dyn Transport,
        source: &SourceDef,
        _since_hours: Option<i64>,
        max_items: usize,
    ) -> Result<AdapterFetch, AdapterError> {
        let response = transport.get(&source.url, 15_000, "hardstop/0.1")?;
        let collection: AlertCollection =
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let items = collection
            .features
            .into_iter()
            .take(max_items)
            .map(|feature| {
                let title = feature
                    .properties
                    .headline
                    .clone()
                    .or_else(|| feature.properties.event.clone())
                    .unwrap_or_default();
                let payload = serde_json::json!({
                    "id": feature.id,
                    "event": feature.properties.event,
                    "area_desc": feature.properties.area_desc,
                    "headline": feature.properties.headline,
                    "description": feature.properties.description,
                    "sent": feature.properties.sent,
                });
                Candidate {
                    canonical_id: feature.id,
                    title,
                    url: feature.properties.web,
                    summary: feature.properties.headline,
                    description: feature.properties.description,
                    content: None,
                    published_at_utc: feature.properties.sent,
                    payload,
                }
            })
            .collect();

        Ok(AdapterFetch {
            items,
            status_code: Some(response.status_code),
            bytes_downloaded: response.bytes_downloaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::MockTransport;
    use crate::config::sources::SourceKind;
    use crate::models::Tier;

    fn source() -> SourceDef {
        SourceDef {
            id: "nws1".to_string(),
            url: "https://example.test/alerts/active".to_string(),
            source_type: SourceKind::NwsAlerts,
            tier: Tier::Regional,
            enabled: true,
            trust_tier: 3,
            classification_floor: 0,
            weighting_bias: 0,
            geo: None,
            max_items: None,
            suppression: Vec::new(),
        }
    }

    const BODY: &str = r#"{
        "features": [
            {
                "id": "urn:oid:nws-1",
                "properties": {
                    "headline": "Severe thunderstorm warning",
                    "event": "Severe Thunderstorm Warning",
                    "description": "Large hail expected.",
                    "areaDesc": "County",
                    "sent": "2026-07-01T00:00:00Z"
                }
            }
        ]
    }"#;

    #[test]
    fn parses_alert_features_into_candidates() {
        let source = source();
        let transport = MockTransport::new().with_body(&source.url, 200, BODY);
        let result = NwsAlertsAdapter.fetch(&transport, &source, None, 10).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "Severe thunderstorm warning");
        assert_eq!(result.items[0].canonical_id.as_deref(), Some("urn:oid:nws-1"));
    }

    #[test]
    fn missing_headline_falls_back_to_event() {
        let body = r#"{"features":[{"id":"a1","properties":{"event":"Flood Watch"}}]}"#;
        let source = source();
        let transport = MockTransport::new().with_body(&source.url, 200, body);
        let result = NwsAlertsAdapter.fetch(&transport, &source, None, 10).unwrap();
        assert_eq!(result.items[0].title, "Flood Watch");
    }
}
