//! Ingest Runner: the per-source batch loop with the hardest contract in
//! the system — exactly one `INGEST` `SourceRun` row per
//! `(source_id, run_group_id)`, no matter how the batch fails, per spec.md
//! §4.9.
//!
//! Grounded in `hardstop/ingest/runner.py::Ingest`: the `source_run_written`
//! flag scoped *inside* the per-source loop (not above it), so one source's
//! outcome never suppresses another's row, and the except-block ordering
//! (item-level rollback vs. batch-level failure) that guarantees
//! attempt-once semantics for the SourceRun write.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::artifacts::ArtifactError;
use crate::config::sources::SourcesConfig;
use crate::config::SuppressionConfig;
use crate::correlation::{upsert_alert, CorrelationError};
use crate::id_gen::new_event_id;
use crate::linker::{link_event_to_network, DEFAULT_MAX_SHIPMENTS};
use crate::models::{Facility, Lane, RawItem, RawItemStatus, Shipment, SourceRun, Tier};
use crate::models::source_run::{RunOutcome, RunPhase};
use crate::normalizer::normalize_external_event;
use crate::scoring::score_and_classify;
use crate::store::{NewItemFilter, Store, StoreError};
use crate::suppression::{evaluate_suppression, MatchableFields};
use crate::time_utils::format_z;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("correlation error: {0}")]
    Correlation(#[from] CorrelationError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("invalid source batch: {0}")]
    InvalidBatch(String),
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub limit: Option<usize>,
    pub min_tier: Option<Tier>,
    pub source_id: Option<String>,
    pub since_hours: Option<i64>,
    pub no_suppress: bool,
    pub explain_suppress: bool,
    pub run_group_id: String,
    pub fail_fast: bool,
    pub allow_ingest_errors: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub processed: usize,
    pub events: usize,
    pub alerts: usize,
    pub suppressed: usize,
    pub errors: usize,
    /// Paths of IncidentEvidence artifacts written by correlation merges
    /// during this run, surfaced so the caller can list them as RunRecord
    /// `output_refs`.
    pub incident_evidence_paths: Vec<std::path::PathBuf>,
}

/// Validates a per-source batch before processing. A present-but-empty
/// item list is legal; an empty `source_id` is not.
fn preflight_source_batch(source_id: &str, _items: &[RawItem]) -> Result<(), IngestError> {
    if source_id.is_empty() {
        return Err(IngestError::InvalidBatch("source_id must not be empty".to_string()));
    }
    Ok(())
}

fn group_by_source_stable(items: Vec<RawItem>) -> Vec<(String, Vec<RawItem>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<RawItem>> = HashMap::new();
    for item in items {
        if !groups.contains_key(&item.source_id) {
            order.push(item.source_id.clone());
        }
        groups.entry(item.source_id.clone()).or_default().push(item);
    }
    order.into_iter().map(|id| (id.clone(), groups.remove(&id).unwrap_or_default())).collect()
}

fn matchable_fields<'a>(event: &'a crate::models::Event, url: &'a str) -> MatchableFields<'a> {
    MatchableFields {
        title: &event.title,
        summary: &event.raw_text,
        raw_text: &event.raw_text,
        url,
        event_type: event.event_type.as_str(),
        source_id: &event.source_id,
        tier: event.tier.as_str(),
    }
}

#[allow(clippy::too_many_arguments)]
struct IngestContext<'a> {
    store: &'a dyn Store,
    sources: &'a SourcesConfig,
    suppression: &'a SuppressionConfig,
    keyword_weights: &'a HashMap<String, i32>,
    facilities: &'a [Facility],
    lanes: &'a [Lane],
    shipments: &'a [Shipment],
    max_shipments: usize,
    now: DateTime<Utc>,
    output_dir: &'a Path,
    options: &'a IngestOptions,
}

/// Per-source counters accumulated across the item loop.
#[derive(Debug, Default)]
struct SourceCounters {
    processed: usize,
    events: usize,
    alerts: usize,
    suppressed: usize,
    errors: usize,
}

fn process_item(ctx: &IngestContext, item: &mut RawItem) -> Result<SourceItemOutcome, IngestError> {
    let Some(source) = ctx.sources.sources.iter().find(|s| s.id == item.source_id) else {
        return Err(IngestError::Store(StoreError::NotFound));
    };

    let event_id = new_event_id(ctx.now);
    let ingested_at_utc = format_z(ctx.now);
    let mut event = normalize_external_event(item, source, event_id, ingested_at_utc);

    if !ctx.options.no_suppress {
        let url = event.payload.get("url").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let fields = matchable_fields(&event, &url);
        let result = evaluate_suppression(&ctx.suppression.rules, &source.suppression, &fields);
        if result.is_suppressed {
            item.status = RawItemStatus::New;
            item.suppression_status = crate::models::raw_item::SuppressionStatus::Suppressed;
            item.primary_rule_id = result.primary_rule_id.clone();
            item.rule_ids = result.matched_rule_ids.clone();
            item.suppressed_at_utc = Some(format_z(ctx.now));
            item.suppression_stage = Some("INGEST".to_string());
            item.reason_code = result.primary_reason_code.clone();
            ctx.store.put_raw_item(item)?;

            event.suppressed = true;
            event.suppression = Some(result);
            ctx.store.put_event(&event)?;
            return Ok(SourceItemOutcome::Suppressed);
        }
    }

    let max_shipments = if ctx.max_shipments == 0 { DEFAULT_MAX_SHIPMENTS } else { ctx.max_shipments };
    let link_outcome = link_event_to_network(&event, ctx.facilities, ctx.lanes, ctx.shipments, max_shipments);
    event.network = link_outcome.network;

    let impact = score_and_classify(&event, ctx.facilities, ctx.lanes, ctx.shipments, ctx.keyword_weights, ctx.now);

    ctx.store.put_event(&event)?;
    let upsert = upsert_alert(ctx.store, &event, impact, link_outcome.linking_notes, ctx.now, ctx.output_dir)?;

    item.status = RawItemStatus::Normalized;
    ctx.store.put_raw_item(item)?;

    Ok(SourceItemOutcome::Linked { alert_id: upsert.alert.alert_id, incident_evidence_path: upsert.incident_evidence_path })
}

enum SourceItemOutcome {
    Suppressed,
    Linked { alert_id: String, incident_evidence_path: Option<std::path::PathBuf> },
}

fn run_group_ids_seen(store: &dyn Store, run_group_id: &str) -> Vec<String> {
    store
        .list_source_runs_for_group(run_group_id)
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.phase == RunPhase::Ingest)
        .map(|r| r.source_id)
        .collect()
}

/// Runs the full ingest procedure: selects NEW raw items, groups them by
/// source, and processes each group's items in order, writing exactly one
/// `INGEST` `SourceRun` row per source regardless of outcome.
#[allow(clippy::too_many_arguments)]
pub fn ingest(
    store: &dyn Store,
    sources: &SourcesConfig,
    suppression: &SuppressionConfig,
    keyword_weights: &HashMap<String, i32>,
    facilities: &[Facility],
    lanes: &[Lane],
    shipments: &[Shipment],
    max_shipments: usize,
    now: DateTime<Utc>,
    output_dir: &Path,
    options: IngestOptions,
) -> Result<IngestSummary, IngestError> {
    let filter = NewItemFilter {
        source_id: options.source_id.clone(),
        min_tier: options.min_tier,
        since_hours: options.since_hours,
        limit: options.limit,
    };
    let items = store.list_new_raw_items(&filter)?;
    let grouped = group_by_source_stable(items);

    let ctx = IngestContext {
        store,
        sources,
        suppression,
        keyword_weights,
        facilities,
        lanes,
        shipments,
        max_shipments,
        now,
        output_dir,
        options: &options,
    };

    let mut summary = IngestSummary::default();
    let already_written: std::collections::HashSet<String> = run_group_ids_seen(store, &options.run_group_id).into_iter().collect();

    for (source_id, mut source_items) in grouped {
        let mut source_run_written = already_written.contains(&source_id);
        let started = Instant::now();
        let started_at_utc = format_z(now);
        let mut counters = SourceCounters::default();

        let preflight = preflight_source_batch(&source_id, &source_items);
        if let Err(err) = preflight {
            if !source_run_written {
                write_source_run(
                    store,
                    &source_id,
                    &options.run_group_id,
                    RunOutcome::Failure,
                    &started_at_utc,
                    started.elapsed(),
                    &counters,
                    Some(err.to_string()),
                );
                source_run_written = true;
            }
            summary.errors += 1;
            if options.fail_fast {
                return Err(err);
            }
            continue;
        }

        let mut batch_error: Option<String> = None;
        'items: for item in source_items.iter_mut() {
            counters.processed += 1;
            match process_item(&ctx, item) {
                Ok(SourceItemOutcome::Suppressed) => {
                    counters.suppressed += 1;
                    counters.events += 1;
                }
                Ok(SourceItemOutcome::Linked { incident_evidence_path, .. }) => {
                    counters.events += 1;
                    counters.alerts += 1;
                    if let Some(path) = incident_evidence_path {
                        summary.incident_evidence_paths.push(path);
                    }
                }
                Err(err) => {
                    warn!(source_id = %source_id, error = %err, "ingest item failed");
                    item.status = RawItemStatus::Failed;
                    item.reason_code = Some(SourceRun::truncate_error(&err.to_string()));
                    let _ = store.put_raw_item(item);
                    counters.errors += 1;
                    if options.fail_fast {
                        if !source_run_written {
                            write_source_run(
                                store,
                                &source_id,
                                &options.run_group_id,
                                RunOutcome::Failure,
                                &started_at_utc,
                                started.elapsed(),
                                &counters,
                                Some(SourceRun::truncate_error(&err.to_string())),
                            );
                            source_run_written = true;
                        }
                        batch_error = Some(err.to_string());
                        break 'items;
                    }
                }
            }
        }

        if let Some(err) = batch_error {
            summary.processed += counters.processed;
            summary.events += counters.events;
            summary.alerts += counters.alerts;
            summary.suppressed += counters.suppressed;
            summary.errors += counters.errors;
            if options.fail_fast {
                return Err(IngestError::Store(StoreError::Backend(err)));
            }
            continue;
        }

        if !source_run_written {
            let status = if counters.errors > 0 && !options.allow_ingest_errors {
                RunOutcome::Failure
            } else {
                RunOutcome::Success
            };
            let error_message = if status == RunOutcome::Failure {
                Some(format!("{} item(s) failed during ingest", counters.errors))
            } else {
                None
            };
            write_source_run(store, &source_id, &options.run_group_id, status, &started_at_utc, started.elapsed(), &counters, error_message);
        }

        summary.processed += counters.processed;
        summary.events += counters.events;
        summary.alerts += counters.alerts;
        summary.suppressed += counters.suppressed;
        summary.errors += counters.errors;
    }

    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn write_source_run(
    store: &dyn Store,
    source_id: &str,
    run_group_id: &str,
    status: RunOutcome,
    started_at_utc: &str,
    elapsed: std::time::Duration,
    counters: &SourceCounters,
    error_message: Option<String>,
) {
    let run = SourceRun {
        run_id: uuid::Uuid::new_v4().to_string(),
        source_id: source_id.to_string(),
        run_group_id: run_group_id.to_string(),
        phase: RunPhase::Ingest,
        status,
        started_at_utc: started_at_utc.to_string(),
        completed_at_utc: format_z(Utc::now()),
        items_fetched: 0,
        items_new: 0,
        items_duplicate: 0,
        items_processed: counters.processed,
        items_suppressed: counters.suppressed,
        items_events_created: counters.events,
        items_alerts_touched: counters.alerts,
        items_errored: counters.errors,
        error_message,
        diagnostics_json: if counters.errors > 0 {
            Some(serde_json::json!({ "errors": counters.errors }))
        } else {
            None
        },
        http_status: None,
        bytes_downloaded: None,
        duration_ms: Some(elapsed.as_millis() as u64),
    };
    if let Err(e) = store.put_source_run(&run) {
        error!(source_id = %source_id, error = %e, "failed to persist INGEST SourceRun");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Candidate;
    use crate::config::sources::{RateLimitConfig, SourceDef, SourceKind};
    use crate::config::SuppressionConfig;
    use crate::dedup::save_candidate;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    fn source_def(id: &str) -> SourceDef {
        SourceDef {
            id: id.to_string(),
            url: "https://example.test/feed".to_string(),
            source_type: SourceKind::Rss,
            tier: Tier::Regional,
            enabled: true,
            trust_tier: 2,
            classification_floor: 0,
            weighting_bias: 0,
            geo: None,
            max_items: None,
            suppression: Vec::new(),
        }
    }

    fn sources_config(defs: Vec<SourceDef>) -> SourcesConfig {
        SourcesConfig { defaults: RateLimitConfig::default(), sources: defs }
    }

    fn candidate(title: &str) -> Candidate {
        Candidate {
            canonical_id: Some(title.to_string()),
            title: title.to_string(),
            url: None,
            summary: Some(title.to_string()),
            description: None,
            content: None,
            published_at_utc: Some("2026-07-28T00:00:00Z".to_string()),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn ingests_new_items_into_events_and_alerts() {
        let store = InMemoryStore::new();
        let source = source_def("s1");
        save_candidate(&store, "s1", Tier::Regional, 2, &candidate("Oil spill reported at plant"), "2026-07-28T00:00:00Z").unwrap();

        let cfg = sources_config(vec![source]);
        let suppression = SuppressionConfig { enabled: true, rules: Vec::new() };
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 1, 0, 0).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let options = IngestOptions {
            limit: None,
            min_tier: None,
            source_id: None,
            since_hours: None,
            no_suppress: false,
            explain_suppress: false,
            run_group_id: "grp-1".to_string(),
            fail_fast: false,
            allow_ingest_errors: false,
        };
        let summary = ingest(&store, &cfg, &suppression, &HashMap::new(), &[], &[], &[], 50, now, dir.path(), options).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.alerts, 1);
        assert_eq!(summary.suppressed, 0);

        let runs = store.list_source_runs_for_group("grp-1").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].phase, RunPhase::Ingest);
        assert_eq!(runs[0].status, RunOutcome::Success);
    }

    #[test]
    fn writes_exactly_one_ingest_run_per_source_even_with_errors() {
        let store = InMemoryStore::new();
        save_candidate(&store, "missing-source", Tier::Regional, 2, &candidate("Storm warning"), "2026-07-28T00:00:00Z").unwrap();
        let cfg = sources_config(vec![]);
        let suppression = SuppressionConfig { enabled: true, rules: Vec::new() };
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 1, 0, 0).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let options = IngestOptions {
            limit: None,
            min_tier: None,
            source_id: None,
            since_hours: None,
            no_suppress: false,
            explain_suppress: false,
            run_group_id: "grp-2".to_string(),
            fail_fast: false,
            allow_ingest_errors: true,
        };
        let summary = ingest(&store, &cfg, &suppression, &HashMap::new(), &[], &[], &[], 50, now, dir.path(), options).unwrap();
        assert_eq!(summary.errors, 1);

        let runs = store.list_source_runs_for_group("grp-2").unwrap();
        assert_eq!(runs.len(), 1);
    }

    #[test]
    fn suppressed_item_skips_alert_flow() {
        let store = InMemoryStore::new();
        let source = source_def("s1");
        save_candidate(&store, "s1", Tier::Regional, 2, &candidate("Scheduled fire drill notice"), "2026-07-28T00:00:00Z").unwrap();

        let cfg = sources_config(vec![source]);
        let rule = crate::suppression::SuppressionRule {
            id: "drill".to_string(),
            enabled: true,
            kind: crate::suppression::SuppressionKind::Keyword,
            field: crate::suppression::SuppressionField::Title,
            pattern: "drill".to_string(),
            case_sensitive: false,
            note: None,
            reason_code: None,
        };
        let suppression = SuppressionConfig { enabled: true, rules: vec![rule] };
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 1, 0, 0).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let options = IngestOptions {
            limit: None,
            min_tier: None,
            source_id: None,
            since_hours: None,
            no_suppress: false,
            explain_suppress: false,
            run_group_id: "grp-3".to_string(),
            fail_fast: false,
            allow_ingest_errors: false,
        };
        let summary = ingest(&store, &cfg, &suppression, &HashMap::new(), &[], &[], &[], 50, now, dir.path(), options).unwrap();
        assert_eq!(summary.suppressed, 1);
        assert_eq!(summary.alerts, 0);
    }
}
