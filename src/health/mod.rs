//! Source-run repo queries and the health scorer, per spec.md §4.11.
//!
//! Grounded in `hardstop/ops/health.py`: the deduction table is applied in a
//! fixed order against a 100-point starting score, then clamped and bucketed.

use chrono::{DateTime, Utc};

use crate::models::source_run::{RunOutcome, RunPhase, SourceRun};
use crate::store::{Store, StoreError};
use crate::time_utils::parse_z;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBucket {
    Healthy,
    Watch,
    Blocked,
}

#[derive(Debug, Clone, Default)]
pub struct SourceHealthMetrics {
    pub success_rate: Option<f64>,
    pub last_success_utc: Option<String>,
    pub last_failure_utc: Option<String>,
    pub consecutive_failures: usize,
    pub stale_hours: Option<f64>,
    pub suppression_ratio: Option<f64>,
    pub avg_bytes_downloaded: Option<f64>,
    pub dedupe_rate: Option<f64>,
    pub avg_duration_seconds: Option<f64>,
    pub last_http_status: Option<u16>,
    pub any_recent_error: bool,
}

#[derive(Debug, Clone)]
pub struct SourceHealth {
    pub source_id: String,
    pub metrics: SourceHealthMetrics,
    pub score: u8,
    pub bucket: HealthBucket,
}

/// Computes per-source health metrics from the last `lookback` FETCH rows
/// (newest first) and all INGEST rows in that same window, per spec.md
/// §4.11.
pub fn compute_metrics(fetch_runs: &[SourceRun], ingest_runs: &[SourceRun]) -> SourceHealthMetrics {
    let mut metrics = SourceHealthMetrics::default();
    if !fetch_runs.is_empty() {
        let successes = fetch_runs.iter().filter(|r| r.status == RunOutcome::Success).count();
        metrics.success_rate = Some(successes as f64 / fetch_runs.len() as f64);

        metrics.last_success_utc = fetch_runs.iter().find(|r| r.status == RunOutcome::Success).map(|r| r.completed_at_utc.clone());
        metrics.last_failure_utc = fetch_runs.iter().find(|r| r.status == RunOutcome::Failure).map(|r| r.completed_at_utc.clone());

        metrics.consecutive_failures = fetch_runs.iter().take_while(|r| r.status == RunOutcome::Failure).count();

        metrics.last_http_status = fetch_runs.first().and_then(|r| r.http_status);
        metrics.any_recent_error = fetch_runs.iter().any(|r| r.status == RunOutcome::Failure);

        let bytes: Vec<u64> = fetch_runs.iter().filter_map(|r| r.bytes_downloaded).collect();
        if !bytes.is_empty() {
            metrics.avg_bytes_downloaded = Some(bytes.iter().sum::<u64>() as f64 / bytes.len() as f64);
        }

        let durations: Vec<f64> = fetch_runs.iter().filter_map(|r| r.duration_ms).map(|ms| ms as f64 / 1000.0).collect();
        if !durations.is_empty() {
            metrics.avg_duration_seconds = Some(durations.iter().sum::<f64>() / durations.len() as f64);
        }

        let fetched: u64 = fetch_runs.iter().map(|r| r.items_fetched as u64).sum();
        let duplicate: u64 = fetch_runs.iter().map(|r| r.items_duplicate as u64).sum();
        if fetched > 0 {
            metrics.dedupe_rate = Some(duplicate as f64 / fetched as f64);
        }
    }

    if !ingest_runs.is_empty() {
        let processed: u64 = ingest_runs.iter().map(|r| r.items_processed as u64).sum();
        let suppressed: u64 = ingest_runs.iter().map(|r| r.items_suppressed as u64).sum();
        if processed > 0 {
            metrics.suppression_ratio = Some(suppressed as f64 / processed as f64);
        }
    }

    metrics
}

pub fn stale_hours_since(last_success_utc: Option<&str>, now: DateTime<Utc>) -> Option<f64> {
    let last = parse_z(last_success_utc?)?;
    Some((now - last).num_seconds() as f64 / 3600.0)
}

/// Applies the deduction table in spec order, clamps to `[0,100]`, and
/// buckets the result.
pub fn score_source(metrics: &SourceHealthMetrics, stale_threshold_hours: f64) -> (u8, HealthBucket) {
    let mut score: i32 = 100;

    match metrics.success_rate {
        Some(rate) if rate < 0.25 => score -= 50,
        Some(rate) if rate < 0.50 => score -= 35,
        Some(rate) if rate < 0.70 => score -= 20,
        Some(rate) if rate < 0.90 => score -= 10,
        None => score -= 15,
        _ => {}
    }

    if let Some(stale) = metrics.stale_hours {
        if stale > stale_threshold_hours {
            score -= 25;
        } else if stale > stale_threshold_hours / 2.0 {
            score -= 10;
        }
    }

    if metrics.consecutive_failures >= 3 {
        score -= 25;
    } else if metrics.consecutive_failures == 2 {
        score -= 10;
    }

    match metrics.last_http_status {
        Some(status) if (500..600).contains(&status) => score -= 20,
        Some(status) if (400..500).contains(&status) => score -= 10,
        _ => {}
    }

    if metrics.any_recent_error {
        score -= 10;
    }

    match metrics.avg_bytes_downloaded {
        Some(bytes) if bytes == 0.0 => score -= 5,
        Some(bytes) if bytes < 500.0 => score -= 3,
        _ => {}
    }

    if metrics.dedupe_rate.map(|r| r > 0.90).unwrap_or(false) {
        score -= 5;
    }

    match metrics.suppression_ratio {
        Some(ratio) if ratio > 0.85 => score -= 10,
        Some(ratio) if ratio > 0.60 => score -= 5,
        _ => {}
    }

    if metrics.avg_duration_seconds.map(|d| d > 15.0).unwrap_or(false) {
        score -= 5;
    }

    let clamped = score.clamp(0, 100) as u8;
    let bucket = if clamped >= 80 {
        HealthBucket::Healthy
    } else if clamped >= 50 {
        HealthBucket::Watch
    } else {
        HealthBucket::Blocked
    };
    (clamped, bucket)
}

/// Fetches the last `lookback` FETCH rows and all INGEST rows for
/// `source_id`, scores them, and returns the full [`SourceHealth`] record.
pub fn evaluate_source_health(
    store: &dyn Store,
    source_id: &str,
    lookback: usize,
    now: DateTime<Utc>,
    stale_threshold_hours: f64,
) -> Result<SourceHealth, StoreError> {
    let all_runs = store.list_source_runs(source_id, lookback.max(1) * 4)?;
    let fetch_runs: Vec<SourceRun> = all_runs.iter().filter(|r| r.phase == RunPhase::Fetch).take(lookback).cloned().collect();
    let ingest_runs: Vec<SourceRun> = all_runs.iter().filter(|r| r.phase == RunPhase::Ingest).take(lookback).cloned().collect();

    let mut metrics = compute_metrics(&fetch_runs, &ingest_runs);
    metrics.stale_hours = stale_hours_since(metrics.last_success_utc.as_deref(), now);

    let (score, bucket) = score_source(&metrics, stale_threshold_hours);
    Ok(SourceHealth { source_id: source_id.to_string(), metrics, score, bucket })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;
    use chrono::TimeZone;

    fn run(phase: RunPhase, status: RunOutcome, completed_at: &str) -> SourceRun {
        SourceRun {
            run_id: "r".to_string(),
            source_id: "s1".to_string(),
            run_group_id: "g".to_string(),
            phase,
            status,
            started_at_utc: completed_at.to_string(),
            completed_at_utc: completed_at.to_string(),
            items_fetched: 10,
            items_new: 5,
            items_duplicate: 5,
            items_processed: 10,
            items_suppressed: 1,
            items_events_created: 9,
            items_alerts_touched: 9,
            items_errored: 0,
            error_message: None,
            diagnostics_json: None,
            http_status: Some(200),
            bytes_downloaded: Some(1000),
            duration_ms: Some(500),
        }
    }

    #[test]
    fn all_successes_scores_full_marks() {
        let runs = vec![
            run(RunPhase::Fetch, RunOutcome::Success, "2026-07-28T00:00:00Z"),
            run(RunPhase::Fetch, RunOutcome::Success, "2026-07-27T00:00:00Z"),
        ];
        let metrics = compute_metrics(&runs, &[]);
        let (score, bucket) = score_source(&metrics, 24.0);
        assert_eq!(score, 100);
        assert_eq!(bucket, HealthBucket::Healthy);
    }

    #[test]
    fn no_success_history_deducts_and_blocks() {
        let runs = vec![run(RunPhase::Fetch, RunOutcome::Failure, "2026-07-28T00:00:00Z")];
        let metrics = compute_metrics(&runs, &[]);
        let (score, bucket) = score_source(&metrics, 24.0);
        assert!(score < 80);
        assert_eq!(bucket, HealthBucket::Blocked);
    }

    #[test]
    fn consecutive_failures_compound_with_low_success_rate() {
        let runs = vec![
            run(RunPhase::Fetch, RunOutcome::Failure, "2026-07-28T02:00:00Z"),
            run(RunPhase::Fetch, RunOutcome::Failure, "2026-07-28T01:00:00Z"),
            run(RunPhase::Fetch, RunOutcome::Failure, "2026-07-28T00:00:00Z"),
        ];
        let metrics = compute_metrics(&runs, &[]);
        assert_eq!(metrics.consecutive_failures, 3);
        let (score, bucket) = score_source(&metrics, 24.0);
        assert_eq!(bucket, HealthBucket::Blocked);
        let _ = Utc.with_ymd_and_hms(2026, 7, 28, 3, 0, 0).unwrap();
    }
}
