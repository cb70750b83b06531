//! Fetcher: orchestrates source adapters with per-host rate limiting,
//! deterministic jitter, and per-source failure isolation, per spec.md §4.2.
//!
//! Grounded in `SourceFetcher.__init__`/`fetch_all` (`sentinel/retrieval/fetcher.py`):
//! `last_fetch_time[host]` tracking, uniform jitter on `[0, jitter_seconds]`
//! from a seeded PRNG, and strict mode collapsing jitter/seed to zero.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::http::{ReqwestTransport, Transport};
use crate::adapters::{adapter_for, AdapterError, Candidate};
use crate::config::sources::{SourceDef, SourcesConfig};
use crate::models::{RunOutcome, Tier};
use crate::time_utils::format_z;

/// Result of fetching a single source, ready to feed the dedup/ingest layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub source_id: String,
    pub fetched_at_utc: String,
    pub status: RunOutcome,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub duration_seconds: f64,
    #[serde(skip)]
    pub items: Vec<Candidate>,
    pub bytes_downloaded: u64,
}

/// Best-effort provenance block attached to a RunRecord (spec.md §4.2):
/// empty in strict mode, otherwise the seed plus a sorted-joined list of
/// adapter versions used during the fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestEffortMetadata {
    pub seed: Option<u64>,
    pub inputs_version: Option<String>,
    pub notes: Option<String>,
}

/// Truncation cap applied to adapter error strings recorded on a
/// `FetchResult`, mirroring `SourceRun::truncate_error`'s 1000-char cap.
const ERROR_TRUNCATE_LEN: usize = 1000;

pub struct SourceFetcher {
    transport: Box<dyn Transport>,
    strict: bool,
    rng_seed: u64,
    last_fetch_time: Mutex<HashMap<String, Instant>>,
    adapter_versions_used: Mutex<Vec<&'static str>>,
}

impl SourceFetcher {
    pub fn new(strict: bool, rng_seed: u64) -> Self {
        Self::with_transport(Box::new(ReqwestTransport), strict, rng_seed)
    }

    pub fn with_transport(transport: Box<dyn Transport>, strict: bool, rng_seed: u64) -> Self {
        let rng_seed = if strict { 0 } else { rng_seed };
        Self {
            transport,
            strict,
            rng_seed,
            last_fetch_time: Mutex::new(HashMap::new()),
            adapter_versions_used: Mutex::new(Vec::new()),
        }
    }

    /// Fetches every enabled source (optionally filtered by minimum tier),
    /// honoring per-host rate limiting and jitter between sources.
    pub fn fetch_all(
        &self,
        sources: &SourcesConfig,
        min_tier: Option<Tier>,
        enabled_only: bool,
        max_items_per_source: Option<usize>,
        since_hours: Option<i64>,
        fail_fast: bool,
    ) -> Vec<FetchResult> {
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        let mut results = Vec::new();

        let candidates: Vec<&SourceDef> = sources
            .sources
            .iter()
            .filter(|s| !enabled_only || s.enabled)
            .filter(|s| min_tier.map_or(true, |t| s.tier.rank() >= t.rank()))
            .collect();

        for source in candidates {
            let max_items = max_items_per_source
                .or(source.max_items)
                .unwrap_or(sources.defaults.max_items);
            let result = self.fetch_one(source, &sources.defaults, since_hours, max_items, &mut rng);
            let failed = matches!(result.status, RunOutcome::Failure);
            results.push(result);
            if failed && fail_fast {
                break;
            }
        }
        results
    }

    /// Fetches a single source by definition, applying the same rate
    /// limiting/jitter policy as [`fetch_all`](Self::fetch_all).
    pub fn fetch_one_named<'a>(
        &self,
        sources: &'a SourcesConfig,
        source_id: &str,
        since_hours: Option<i64>,
        max_items: Option<usize>,
    ) -> Option<FetchResult> {
        let source = sources.sources.iter().find(|s| s.id == source_id)?;
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        let max_items = max_items.or(source.max_items).unwrap_or(sources.defaults.max_items);
        Some(self.fetch_one(source, &sources.defaults, since_hours, max_items, &mut rng))
    }

    fn fetch_one(
        &self,
        source: &SourceDef,
        defaults: &crate::config::sources::RateLimitConfig,
        since_hours: Option<i64>,
        max_items: usize,
        rng: &mut StdRng,
    ) -> FetchResult {
        self.rate_limit(&source.url, defaults.per_host_interval_ms);
        self.jitter_sleep(defaults.jitter_ms, rng);

        let started = Instant::now();
        let fetched_at_utc = format_z(chrono::Utc::now());
        let adapter = adapter_for(source.source_type);

        {
            let mut used = self.adapter_versions_used.lock().expect("lock poisoned");
            used.push(adapter.adapter_version());
        }

        match adapter.fetch(self.transport.as_ref(), source, since_hours, max_items) {
            Ok(fetch) => {
                info!(source_id = %source.id, items = fetch.items.len(), "fetch succeeded");
                FetchResult {
                    source_id: source.id.clone(),
                    fetched_at_utc,
                    status: RunOutcome::Success,
                    status_code: fetch.status_code,
                    error: None,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    items: fetch.items,
                    bytes_downloaded: fetch.bytes_downloaded,
                }
            }
            Err(err) => {
                warn!(source_id = %source.id, error = %err, "fetch failed");
                FetchResult {
                    source_id: source.id.clone(),
                    fetched_at_utc,
                    status: RunOutcome::Failure,
                    status_code: err.status_code(),
                    error: Some(truncate_error(&err)),
                    duration_seconds: started.elapsed().as_secs_f64(),
                    items: Vec::new(),
                    bytes_downloaded: 0,
                }
            }
        }
    }

    fn rate_limit(&self, url: &str, per_host_interval_ms: u64) {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string());

        let wait = {
            let mut last = self.last_fetch_time.lock().expect("lock poisoned");
            let now = Instant::now();
            let wait = last.get(&host).and_then(|prev| {
                let min_gap = Duration::from_millis(per_host_interval_ms);
                let elapsed = now.duration_since(*prev);
                if elapsed < min_gap {
                    Some(min_gap - elapsed)
                } else {
                    None
                }
            });
            last.insert(host, now + wait.unwrap_or_default());
            wait
        };
        if let Some(wait) = wait {
            std::thread::sleep(wait);
        }
    }

    fn jitter_sleep(&self, jitter_ms: u64, rng: &mut StdRng) {
        if self.strict || jitter_ms == 0 {
            return;
        }
        let jitter = rng.gen_range(0..=jitter_ms);
        if jitter > 0 {
            std::thread::sleep(Duration::from_millis(jitter));
        }
    }

    /// `{seed, inputs_version, notes}` when non-strict; empty when strict,
    /// per spec.md §4.2.
    pub fn best_effort_metadata(&self) -> BestEffortMetadata {
        if self.strict {
            return BestEffortMetadata::default();
        }
        let mut versions: Vec<&'static str> = self
            .adapter_versions_used
            .lock()
            .expect("lock poisoned")
            .clone();
        versions.sort_unstable();
        versions.dedup();
        BestEffortMetadata {
            seed: Some(self.rng_seed),
            inputs_version: Some(versions.join(",")),
            notes: None,
        }
    }
}

fn truncate_error(err: &AdapterError) -> String {
    let s = err.to_string();
    if s.len() > ERROR_TRUNCATE_LEN {
        s.chars().take(ERROR_TRUNCATE_LEN).collect()
    } else {
        s
    }
}
