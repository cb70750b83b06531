//! RSS/Atom adapter, backed by `feed-rs`.

use crate::adapters::http::Transport;
use crate::adapters::{AdapterError, AdapterFetch, Candidate, SourceAdapter};
use crate::config::sources::SourceDef;

pub struct RssAdapter;

impl SourceAdapter for RssAdapter {
    fn adapter_version(&self) -> &'static str {
        "rss-adapter-1"
    }

    fn fetch(
        &self,
        transport: &dyn Transport,
        source: &SourceDef,
        _since_hours: Option<i64>,
        max_items: usize,
    ) -> Result<AdapterFetch, AdapterError> {
        let response = transport.get(&source.url, 15_000, "hardstop/0.1")?;
        let feed = feed_rs::parser::parse(response.body.as_bytes())
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .take(max_items)
            .map(|entry| {
                let title = entry.title.map(|t| t.content).unwrap_or_default();
                let summary = entry.summary.map(|s| s.content);
                let content = entry.content.and_then(|c| c.body);
                let url = entry.links.first().map(|l| l.href.clone());
                let published_at_utc = entry.published.or(entry.updated).map(|dt| dt.to_rfc3339());
                let payload = serde_json::json!({
                    "entry_id": entry.id,
                    "title": title,
                    "summary": summary,
                    "content": content,
                    "links": entry.links.iter().map(|l| l.href.clone()).collect::<Vec<_>>(),
                });
                Candidate {
                    canonical_id: Some(entry.id),
                    title,
                    url,
                    summary,
                    description: None,
                    content,
                    published_at_utc,
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
