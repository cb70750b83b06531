//! Shared HTTP transport seam.
//!
//! Adapters never call `reqwest` directly; they go through [`Transport`], so
//! tests can swap in [`MockTransport`] and the fetch kernel stays free of
//! real network calls, per SPEC_FULL.md §0.4. Grounded in the teacher's
//! `PacketSource` trait seam (`src/pipeline/source.rs`), adapted from an
//! async packet stream to a synchronous request/response call since the
//! ingest kernel runs on the calling thread (SPEC_FULL.md §5).

use std::collections::HashMap;
use std::time::Duration;

use crate::adapters::AdapterError;

/// Response returned by any [`Transport`] implementation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub bytes_downloaded: u64,
}

/// Blocking HTTP fetch seam. Implemented by [`ReqwestTransport`] for
/// production use and [`MockTransport`] for tests.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, timeout_ms: u64, user_agent: &str) -> Result<HttpResponse, AdapterError>;
}

/// Production transport backed by `reqwest::blocking::Client`.
pub struct ReqwestTransport;

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, timeout_ms: u64, user_agent: &str) -> Result<HttpResponse, AdapterError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        let response = client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout
            } else {
                AdapterError::Transport(e.to_string())
            }
        })?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(AdapterError::HttpStatus(status_code));
        }
        let body = response.text().map_err(|e| AdapterError::Transport(e.to_string()))?;
        let bytes_downloaded = body.len() as u64;
        Ok(HttpResponse {
            status_code,
            body,
            bytes_downloaded,
        })
    }
}

/// Canned-response transport for adapter unit tests. Looks responses up by
/// exact URL; a URL with no registered response yields a `FAILURE`-mapped
/// error, matching a source that's unreachable.
#[derive(Default)]
pub struct MockTransport {
    responses: HashMap<String, Result<HttpResponse, AdapterError>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, status_code: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        self.responses.insert(
            url.to_string(),
            Ok(HttpResponse {
                status_code,
                bytes_downloaded: body.len() as u64,
                body,
            }),
        );
        self
    }

    pub fn with_error(mut self, url: &str, error: AdapterError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str, _timeout_ms: u64, _user_agent: &str) -> Result<HttpResponse, AdapterError> {
        match self.responses.get(url) {
            Some(Ok(resp)) => Ok(resp.clone()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(AdapterError::Transport(format!("no mock response registered for {url}"))),
        }
    }
}
