//! Run Status Evaluator: turns fetch/ingest/health findings into a single
//! `{HEALTHY, WARNING, BROKEN}` exit code with top-3 stable-sorted
//! messages, per spec.md §4.12.
//!
//! Grounded in `hardstop/ops/run_status.py`: BROKEN short-circuits in a
//! fixed priority order, WARNING is an OR-combination, and `strict` mode
//! promotes any WARNING to BROKEN.

use serde::Serialize;

use crate::fetcher::FetchResult;
use crate::health::HealthBucket;
use crate::models::source_run::{RunOutcome, SourceRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Healthy,
    Warning,
    Broken,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Healthy => 0,
            RunStatus::Warning => 1,
            RunStatus::Broken => 2,
        }
    }
}

/// Per-source health summary, trimmed to what the evaluator needs.
#[derive(Debug, Clone)]
pub struct SourceHealthSummary {
    pub source_id: String,
    pub bucket: HealthBucket,
}

#[derive(Debug, Clone, Default)]
pub struct RunStatusInputs {
    pub fetch_results: Vec<FetchResult>,
    pub ingest_runs: Vec<SourceRun>,
    pub doctor_findings: Vec<String>,
    pub stale_source_ids: Vec<String>,
    pub enabled_source_count: usize,
    pub config_parse_error: bool,
    pub schema_drift_detected: bool,
    pub source_health: Vec<SourceHealthSummary>,
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatusResult {
    pub status: RunStatus,
    pub exit_code: i32,
    pub messages: Vec<String>,
}

fn broken_reasons(inputs: &RunStatusInputs) -> Vec<String> {
    let mut reasons = Vec::new();

    if inputs.config_parse_error {
        reasons.push("config parse error".to_string());
    }
    if inputs.schema_drift_detected {
        reasons.push("schema drift detected".to_string());
    }
    if inputs.enabled_source_count == 0 {
        reasons.push("zero enabled sources".to_string());
    }
    let blocked: Vec<&str> = inputs
        .source_health
        .iter()
        .filter(|h| h.bucket == HealthBucket::Blocked)
        .map(|h| h.source_id.as_str())
        .collect();
    if !blocked.is_empty() {
        reasons.push(format!("source(s) exhausted failure budget: {}", blocked.join(",")));
    }
    if !inputs.fetch_results.is_empty() && inputs.fetch_results.iter().all(|r| r.status == RunOutcome::Failure) {
        reasons.push("all fetches failed".to_string());
    }
    let any_items_fetched = inputs.fetch_results.iter().any(|r| !r.items.is_empty());
    if any_items_fetched && inputs.ingest_runs.is_empty() {
        reasons.push("ingest crashed before any source processed".to_string());
    }

    reasons
}

fn warning_reasons(inputs: &RunStatusInputs) -> Vec<String> {
    let mut reasons = Vec::new();

    let failed_fetches: Vec<&str> = inputs
        .fetch_results
        .iter()
        .filter(|r| r.status == RunOutcome::Failure)
        .map(|r| r.source_id.as_str())
        .collect();
    if !failed_fetches.is_empty() {
        reasons.push(format!("source(s) failed fetch: {}", failed_fetches.join(",")));
    }

    if !inputs.stale_source_ids.is_empty() {
        reasons.push(format!("source(s) stale: {}", inputs.stale_source_ids.join(",")));
    }

    let failed_ingests: Vec<&str> = inputs
        .ingest_runs
        .iter()
        .filter(|r| r.status == RunOutcome::Failure || r.items_errored > 0)
        .map(|r| r.source_id.as_str())
        .collect();
    if !failed_ingests.is_empty() {
        reasons.push(format!("ingest run(s) with errors: {}", failed_ingests.join(",")));
    }

    if !inputs.doctor_findings.is_empty() {
        reasons.push(format!("suppression warnings: {}", inputs.doctor_findings.join("; ")));
    }

    let watch: Vec<&str> = inputs
        .source_health
        .iter()
        .filter(|h| h.bucket == HealthBucket::Watch)
        .map(|h| h.source_id.as_str())
        .collect();
    if !watch.is_empty() {
        reasons.push(format!("source(s) in health WATCH: {}", watch.join(",")));
    }

    reasons
}

/// Evaluates run status from fetch/ingest/health findings, applying the
/// BROKEN short-circuit priority order first, then OR-combining WARNING
/// conditions, then promoting WARNING to BROKEN under `strict`.
pub fn evaluate_run_status(inputs: &RunStatusInputs) -> RunStatusResult {
    let broken = broken_reasons(inputs);
    if !broken.is_empty() {
        let messages = broken.into_iter().take(3).collect();
        return RunStatusResult { status: RunStatus::Broken, exit_code: RunStatus::Broken.exit_code(), messages };
    }

    let warnings = warning_reasons(inputs);
    if !warnings.is_empty() {
        if inputs.strict {
            let messages = warnings.into_iter().take(3).collect();
            return RunStatusResult { status: RunStatus::Broken, exit_code: RunStatus::Broken.exit_code(), messages };
        }
        let messages = warnings.into_iter().take(3).collect();
        return RunStatusResult { status: RunStatus::Warning, exit_code: RunStatus::Warning.exit_code(), messages };
    }

    let any_success = inputs.fetch_results.iter().any(|r| r.status == RunOutcome::Success);
    if any_success {
        RunStatusResult { status: RunStatus::Healthy, exit_code: 0, messages: Vec::new() }
    } else {
        RunStatusResult {
            status: RunStatus::Warning,
            exit_code: RunStatus::Warning.exit_code(),
            messages: vec!["no successful fetch recorded".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::source_run::{RunPhase, SourceRun};

    fn fetch(source_id: &str, status: RunOutcome) -> FetchResult {
        FetchResult {
            source_id: source_id.to_string(),
            fetched_at_utc: "2026-07-28T00:00:00Z".to_string(),
            status,
            status_code: None,
            error: None,
            duration_seconds: 0.1,
            items: Vec::new(),
            bytes_downloaded: 0,
        }
    }

    fn ingest_run(source_id: &str, status: RunOutcome, items_errored: usize) -> SourceRun {
        SourceRun {
            run_id: "r".to_string(),
            source_id: source_id.to_string(),
            run_group_id: "g".to_string(),
            phase: RunPhase::Ingest,
            status,
            started_at_utc: "2026-07-28T00:00:00Z".to_string(),
            completed_at_utc: "2026-07-28T00:00:01Z".to_string(),
            items_fetched: 0,
            items_new: 0,
            items_duplicate: 0,
            items_processed: 1,
            items_suppressed: 0,
            items_events_created: 1,
            items_alerts_touched: 1,
            items_errored,
            error_message: None,
            diagnostics_json: None,
            http_status: None,
            bytes_downloaded: None,
            duration_ms: Some(10),
        }
    }

    #[test]
    fn zero_enabled_sources_is_broken() {
        let inputs = RunStatusInputs { enabled_source_count: 0, ..Default::default() };
        let result = evaluate_run_status(&inputs);
        assert_eq!(result.status, RunStatus::Broken);
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn all_healthy_fetch_is_healthy() {
        let inputs = RunStatusInputs {
            fetch_results: vec![fetch("s1", RunOutcome::Success)],
            enabled_source_count: 1,
            ..Default::default()
        };
        let result = evaluate_run_status(&inputs);
        assert_eq!(result.status, RunStatus::Healthy);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn ingest_errors_are_a_warning() {
        let inputs = RunStatusInputs {
            fetch_results: vec![fetch("s1", RunOutcome::Success)],
            ingest_runs: vec![ingest_run("s1", RunOutcome::Success, 2)],
            enabled_source_count: 1,
            ..Default::default()
        };
        let result = evaluate_run_status(&inputs);
        assert_eq!(result.status, RunStatus::Warning);
    }

    #[test]
    fn strict_mode_promotes_warning_to_broken() {
        let inputs = RunStatusInputs {
            fetch_results: vec![fetch("s1", RunOutcome::Success)],
            ingest_runs: vec![ingest_run("s1", RunOutcome::Success, 2)],
            enabled_source_count: 1,
            strict: true,
            ..Default::default()
        };
        let result = evaluate_run_status(&inputs);
        assert_eq!(result.status, RunStatus::Broken);
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn all_fetches_failed_is_broken() {
        let inputs = RunStatusInputs {
            fetch_results: vec![fetch("s1", RunOutcome::Failure), fetch("s2", RunOutcome::Failure)],
            enabled_source_count: 2,
            ..Default::default()
        };
        let result = evaluate_run_status(&inputs);
        assert_eq!(result.status, RunStatus::Broken);
    }
}
