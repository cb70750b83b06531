//! FEMA-style JSON adapter (OpenFEMA disaster-declarations envelope:
//! `{"DisasterDeclarationsSummaries": [...]}`).

use serde::Deserialize;

use crate::adapters::http::Transport;
use crate::adapters::{AdapterError, AdapterFetch, Candidate, SourceAdapter};
use crate::config::sources::SourceDef;

#[derive(Debug, Deserialize)]
struct FemaCollection {
    #[serde(default, rename = "DisasterDeclarationsSummaries")]
    summaries: Vec<FemaDeclaration>,
}

#[derive(Debug, Deserialize)]
struct FemaDeclaration {
    #[serde(rename = "disasterNumber")]
    disaster_number: Option<serde_json::Value>,
    #[serde(rename = "declarationTitle")]
    declaration_title: Option<String>,
    #[serde(rename = "incidentType")]
    incident_type: Option<String>,
    state: Option<String>,
    #[serde(rename = "declarationDate")]
    declaration_date: Option<String>,
}

pub struct FemaAdapter;

impl SourceAdapter for FemaAdapter {
    fn adapter_version(&self) -> &'static str {
        "fema-adapter-1"
    }

    fn fetch(
        &self,
        transport: &dyn Transport,
        source: &SourceDef,
        _since_hours: Option<i64>,
        max_items: usize,
    ) -> Result<AdapterFetch, AdapterError> {
        let response = transport.get(&source.url, 15_000, "hardstop/0.1")?;
        let collection: FemaCollection =
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let items = collection
            .summaries
            .into_iter()
            .take(max_items)
            .map(|declaration| {
                let canonical_id = declaration.disaster_number.as_ref().map(|v| v.to_string());
                let title = declaration
                    .declaration_title
                    .clone()
                    .or_else(|| declaration.incident_type.clone())
                    .unwrap_or_default();
                let payload = serde_json::json!({
                    "disaster_number": declaration.disaster_number,
                    "incident_type": declaration.incident_type,
                    "state": declaration.state,
                    "declaration_date": declaration.declaration_date,
                });
                Candidate {
                    canonical_id,
                    title,
                    url: None,
                    summary: declaration.incident_type.clone(),
                    description: None,
                    content: None,
                    published_at_utc: declaration.declaration_date,
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
            id: "fema1".to_string(),
            url: "https://example.test/fema/declarations".to_string(),
            source_type: SourceKind::Fema,
            tier: Tier::Global,
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
        "DisasterDeclarationsSummaries": [
            {
                "disasterNumber": 4901,
                "declarationTitle": "SEVERE STORMS AND FLOODING",
                "incidentType": "Flood",
                "state": "TX",
                "declarationDate": "2026-07-01T00:00:00Z"
            }
        ]
    }"#;

    #[test]
    fn parses_declarations_into_candidates() {
        let source = source();
        let transport = MockTransport::new().with_body(&source.url, 200, BODY);
        let result = FemaAdapter.fetch(&transport, &source, None, 10).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "SEVERE STORMS AND FLOODING");
        assert_eq!(result.items[0].canonical_id.as_deref(), Some("4901"));
    }
}
