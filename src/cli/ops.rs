//! Command implementations. Each command: loads config/fixtures, opens the
//! store, does its work, emits a RunRecord (the operations that the data
//! model ties one to — fetch/ingest/run/replay), prints one JSON document,
//! and returns an exit code.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::artifacts::incident_evidence::{replay_check, IncidentEvidence};
use crate::artifacts::{emit_run_record, fingerprint_config, ArtifactRef, RunMode, RunRecord};
use crate::cli::brief::build_brief;
use crate::cli::paths::Paths;
use crate::cli::{bootstrap, Cli, Command, ExportAction, IncidentsAction, SourcesAction};
use crate::config::HardstopConfig;
use crate::dedup::save_candidate;
use crate::fetcher::{FetchResult, SourceFetcher};
use crate::health::evaluate_source_health;
use crate::id_gen::DeterministicIdGuard;
use crate::ingest::{ingest, IngestOptions};
use crate::models::source_run::{RunOutcome, RunPhase};
use crate::models::{SourceRun, Tier};
use crate::run_status::{evaluate_run_status, RunStatusInputs, SourceHealthSummary};
use crate::store::Store;
use crate::time_utils::format_z;

fn paths_from(cli: &Cli) -> Paths {
    Paths {
        config_dir: cli.config_dir.clone(),
        data_dir: cli.data_dir.clone(),
        fixtures_dir: cli.fixtures_dir.clone(),
        output_dir: cli.output_dir.clone(),
    }
}

fn config_hash(paths: &Paths) -> Result<String> {
    Ok(fingerprint_config(paths.runtime_toml(), paths.sources_toml(), paths.suppression_toml())?)
}

fn run_mode(strict: bool) -> RunMode {
    if strict {
        RunMode::Strict
    } else {
        RunMode::BestEffort
    }
}

fn rng_seed(cfg: &HardstopConfig, strict: bool) -> u64 {
    if strict {
        return 0;
    }
    cfg.runtime.rng_seed.unwrap_or_else(|| rand::random::<u64>())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn dispatch(cli: Cli) -> Result<i32> {
    let paths = paths_from(&cli);
    let strict_override = cli.strict;
    match cli.command {
        Command::Fetch { tier, source, since_hours, max_items, fail_fast, run_group } => {
            cmd_fetch(&paths, strict_override, tier, source, since_hours, max_items, fail_fast, run_group)
        }
        Command::IngestExternal {
            limit,
            min_tier,
            source,
            since_hours,
            no_suppress,
            explain_suppress,
            fail_fast,
            allow_ingest_errors,
            run_group,
        } => cmd_ingest(
            &paths,
            strict_override,
            limit,
            min_tier,
            source,
            since_hours,
            no_suppress,
            explain_suppress,
            fail_fast,
            allow_ingest_errors,
            run_group,
        ),
        Command::Run { tier, fail_fast, allow_ingest_errors } => cmd_run(&paths, strict_override, tier, fail_fast, allow_ingest_errors),
        Command::Brief { since_hours, top } => cmd_brief(&paths, since_hours, top),
        Command::Doctor => cmd_doctor(&paths),
        Command::Incidents { action } => cmd_incidents(&paths, action),
        Command::Sources { action } => cmd_sources(&paths, action),
        Command::Export { action } => cmd_export(&paths, action),
        Command::Init { force } => cmd_init(&paths, force),
    }
}

#[derive(Debug, Serialize)]
struct FetchResultSummary {
    source_id: String,
    status: RunOutcome,
    items_fetched: usize,
    items_new: usize,
    items_duplicate: usize,
    http_status: Option<u16>,
    error: Option<String>,
}

/// Saves each candidate via the dedup layer and writes one FETCH-phase
/// SourceRun row per result. Returns per-source summaries for CLI output.
fn persist_fetch_results(
    store: &dyn Store,
    cfg: &HardstopConfig,
    results: &[FetchResult],
    run_group_id: &str,
) -> Vec<FetchResultSummary> {
    let mut summaries = Vec::with_capacity(results.len());
    for result in results {
        let source = cfg.sources.sources.iter().find(|s| s.id == result.source_id);
        let (tier, trust_tier) = source.map(|s| (s.tier, s.trust_tier)).unwrap_or((Tier::Unknown, 2));

        let mut items_new = 0usize;
        for candidate in &result.items {
            match save_candidate(store, &result.source_id, tier, trust_tier, candidate, &result.fetched_at_utc) {
                Ok(outcome) if outcome.is_new() => items_new += 1,
                Ok(_) => {}
                Err(err) => warn!(source_id = %result.source_id, error = %err, "failed to save fetched item"),
            }
        }
        let items_fetched = result.items.len();
        let items_duplicate = items_fetched.saturating_sub(items_new);

        let run = SourceRun {
            run_id: uuid::Uuid::new_v4().to_string(),
            source_id: result.source_id.clone(),
            run_group_id: run_group_id.to_string(),
            phase: RunPhase::Fetch,
            status: result.status,
            started_at_utc: result.fetched_at_utc.clone(),
            completed_at_utc: format_z(Utc::now()),
            items_fetched,
            items_new,
            items_duplicate,
            items_processed: 0,
            items_suppressed: 0,
            items_events_created: 0,
            items_alerts_touched: 0,
            items_errored: if result.status == RunOutcome::Failure { 1 } else { 0 },
            error_message: result.error.clone(),
            diagnostics_json: None,
            http_status: result.status_code,
            bytes_downloaded: Some(result.bytes_downloaded),
            duration_ms: Some((result.duration_seconds * 1000.0) as u64),
        };
        if let Err(err) = store.put_source_run(&run) {
            error!(source_id = %result.source_id, error = %err, "failed to persist FETCH SourceRun");
        }

        summaries.push(FetchResultSummary {
            source_id: result.source_id.clone(),
            status: result.status,
            items_fetched,
            items_new,
            items_duplicate,
            http_status: result.status_code,
            error: result.error.clone(),
        });
    }
    summaries
}

fn run_fetch_phase(
    store: &dyn Store,
    cfg: &HardstopConfig,
    strict: bool,
    tier: Option<Tier>,
    source: Option<&str>,
    since_hours: Option<i64>,
    max_items: Option<usize>,
    fail_fast: bool,
    run_group_id: &str,
) -> (Vec<FetchResult>, crate::fetcher::BestEffortMetadata, Vec<FetchResultSummary>) {
    let fetcher = SourceFetcher::new(strict, rng_seed(cfg, strict));
    let results = match source {
        Some(source_id) => fetcher.fetch_one_named(&cfg.sources, source_id, since_hours, max_items).into_iter().collect(),
        None => fetcher.fetch_all(&cfg.sources, tier, true, max_items, since_hours, fail_fast),
    };
    let summaries = persist_fetch_results(store, cfg, &results, run_group_id);
    let best_effort = fetcher.best_effort_metadata();
    (results, best_effort, summaries)
}

#[allow(clippy::too_many_arguments)]
fn cmd_fetch(
    paths: &Paths,
    strict_override: bool,
    tier: Option<Tier>,
    source: Option<String>,
    since_hours: Option<i64>,
    max_items: Option<usize>,
    fail_fast: bool,
    run_group: Option<String>,
) -> Result<i32> {
    let cfg = bootstrap::load_config(paths)?;
    let strict = strict_override || cfg.runtime.strict;
    let store = bootstrap::open_store(paths)?;
    let run_group_id = run_group.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let started_at = Utc::now();
    let (results, best_effort, summaries) =
        run_fetch_phase(store.as_ref(), &cfg, strict, tier, source.as_deref(), since_hours, max_items, fail_fast, &run_group_id);
    let ended_at = Utc::now();

    let failed: Vec<String> = results.iter().filter(|r| r.status == RunOutcome::Failure).map(|r| r.source_id.clone()).collect();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    for source_id in &failed {
        let message = format!("fetch failed for source {source_id}");
        if strict {
            errors.push(message);
        } else {
            warnings.push(message);
        }
    }

    let record = RunRecord {
        run_id: run_group_id.clone(),
        operator_id: "hardstop.fetch@1.0.0".to_string(),
        mode: run_mode(strict),
        started_at: format_z(started_at),
        ended_at: format_z(ended_at),
        config_hash: config_hash(paths)?,
        input_refs: Vec::new(),
        output_refs: Vec::new(),
        warnings,
        errors,
        best_effort: if strict { None } else { Some(best_effort) },
        cost: None,
        artifact_hash: None,
    };
    let record_path = emit_run_record(paths.run_records_dir(), record.clone(), None, None)?;

    let status_inputs = RunStatusInputs {
        fetch_results: results,
        ingest_runs: Vec::new(),
        doctor_findings: Vec::new(),
        stale_source_ids: Vec::new(),
        enabled_source_count: cfg.sources.enabled_sources().count(),
        config_parse_error: false,
        schema_drift_detected: false,
        source_health: Vec::new(),
        strict,
    };
    let status = evaluate_run_status(&status_inputs);

    print_json(&json!({
        "run_record_path": record_path,
        "run_record": record,
        "results": summaries,
        "status": status,
    }))?;
    Ok(status.exit_code)
}

#[allow(clippy::too_many_arguments)]
fn cmd_ingest(
    paths: &Paths,
    strict_override: bool,
    limit: Option<usize>,
    min_tier: Option<Tier>,
    source: Option<String>,
    since_hours: Option<i64>,
    no_suppress: bool,
    explain_suppress: bool,
    fail_fast: bool,
    allow_ingest_errors: bool,
    run_group: Option<String>,
) -> Result<i32> {
    let cfg = bootstrap::load_config(paths)?;
    let strict = strict_override || cfg.runtime.strict;
    let store = bootstrap::open_store(paths)?;
    let fixtures = bootstrap::load_fixtures(paths);
    let run_group_id = run_group.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let started_at = Utc::now();
    let options = IngestOptions {
        limit,
        min_tier,
        source_id: source,
        since_hours,
        no_suppress,
        explain_suppress,
        run_group_id: run_group_id.clone(),
        fail_fast,
        allow_ingest_errors,
    };
    let keyword_weights = bootstrap::keyword_weights(&cfg);
    let max_shipments = cfg.runtime.default_max_shipments;

    let summary = {
        let _guard = strict.then(|| DeterministicIdGuard::install(started_at, rng_seed(&cfg, strict)));
        ingest(
            store.as_ref(),
            &cfg.sources,
            &cfg.suppression,
            &keyword_weights,
            &fixtures.facilities,
            &fixtures.lanes,
            &fixtures.shipments,
            max_shipments,
            started_at,
            paths.run_records_dir(),
            options,
        )?
    };
    let ended_at = Utc::now();

    let ingest_runs: Vec<SourceRun> = store
        .list_source_runs_for_group(&run_group_id)?
        .into_iter()
        .filter(|r| r.phase == RunPhase::Ingest)
        .collect();

    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    if summary.errors > 0 {
        let message = format!("{} item(s) failed during ingest", summary.errors);
        if strict {
            errors.push(message);
        } else {
            warnings.push(message);
        }
    }

    let record = RunRecord {
        run_id: run_group_id.clone(),
        operator_id: "hardstop.ingest@1.0.0".to_string(),
        mode: run_mode(strict),
        started_at: format_z(started_at),
        ended_at: format_z(ended_at),
        config_hash: config_hash(paths)?,
        input_refs: Vec::new(),
        output_refs: incident_evidence_output_refs(&summary.incident_evidence_paths),
        warnings,
        errors,
        best_effort: None,
        cost: None,
        artifact_hash: None,
    };
    let record_path = emit_run_record(paths.run_records_dir(), record.clone(), None, None)?;

    let status_inputs = RunStatusInputs {
        fetch_results: Vec::new(),
        ingest_runs,
        doctor_findings: Vec::new(),
        stale_source_ids: Vec::new(),
        enabled_source_count: cfg.sources.enabled_sources().count(),
        config_parse_error: false,
        schema_drift_detected: false,
        source_health: Vec::new(),
        strict,
    };
    let status = evaluate_run_status(&status_inputs);

    print_json(&json!({
        "run_record_path": record_path,
        "run_record": record,
        "summary": summary,
        "status": status,
    }))?;
    Ok(status.exit_code)
}

/// Reads back each freshly-written IncidentEvidence file to build the
/// RunRecord `output_refs` entries the replay operator looks for.
fn incident_evidence_output_refs(paths: &[PathBuf]) -> Vec<ArtifactRef> {
    paths
        .iter()
        .filter_map(|path| {
            let contents = std::fs::read_to_string(path).ok()?;
            let evidence: crate::artifacts::incident_evidence::IncidentEvidence = serde_json::from_str(&contents).ok()?;
            let bytes = contents.len() as u64;
            Some(ArtifactRef {
                id: path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
                kind: crate::artifacts::incident_evidence::KIND.to_string(),
                hash: evidence.artifact_hash.unwrap_or_default(),
                schema: Some(crate::artifacts::incident_evidence::ARTIFACT_VERSION.to_string()),
                bytes: Some(bytes),
            })
        })
        .collect()
}

fn stale_source_ids(store: &dyn Store, cfg: &HardstopConfig, now: chrono::DateTime<Utc>) -> (Vec<String>, Vec<SourceHealthSummary>) {
    let mut stale = Vec::new();
    let mut health_summaries = Vec::new();
    for source in cfg.sources.enabled_sources() {
        if let Ok(health) = evaluate_source_health(store, &source.id, cfg.runtime.health_lookback_runs, now, cfg.runtime.stale_hours as f64) {
            if health.metrics.stale_hours.map(|h| h > cfg.runtime.stale_hours as f64).unwrap_or(false) {
                stale.push(source.id.clone());
            }
            health_summaries.push(SourceHealthSummary { source_id: source.id.clone(), bucket: health.bucket });
        }
    }
    (stale, health_summaries)
}

fn cmd_run(paths: &Paths, strict_override: bool, tier: Option<Tier>, fail_fast: bool, allow_ingest_errors: bool) -> Result<i32> {
    let cfg = match bootstrap::load_config(paths) {
        Ok(cfg) => cfg,
        Err(err) => {
            let status_inputs = RunStatusInputs { config_parse_error: true, strict: strict_override, ..Default::default() };
            let status = evaluate_run_status(&status_inputs);
            print_json(&json!({ "status": status, "error": err.to_string() }))?;
            return Ok(status.exit_code);
        }
    };
    let strict = strict_override || cfg.runtime.strict;
    let store = bootstrap::open_store(paths)?;
    let fixtures = bootstrap::load_fixtures(paths);
    let run_group_id = uuid::Uuid::new_v4().to_string();

    let started_at = Utc::now();
    let (fetch_results, best_effort, fetch_summaries) =
        run_fetch_phase(store.as_ref(), &cfg, strict, tier, None, None, None, fail_fast, &run_group_id);

    let keyword_weights = bootstrap::keyword_weights(&cfg);
    let max_shipments = cfg.runtime.default_max_shipments;
    let options = IngestOptions {
        limit: None,
        min_tier: None,
        source_id: None,
        since_hours: None,
        no_suppress: false,
        explain_suppress: false,
        run_group_id: run_group_id.clone(),
        fail_fast,
        allow_ingest_errors,
    };
    let ingest_summary = {
        let now = Utc::now();
        let _guard = strict.then(|| DeterministicIdGuard::install(now, rng_seed(&cfg, strict)));
        ingest(
            store.as_ref(),
            &cfg.sources,
            &cfg.suppression,
            &keyword_weights,
            &fixtures.facilities,
            &fixtures.lanes,
            &fixtures.shipments,
            max_shipments,
            now,
            paths.run_records_dir(),
            options,
        )?
    };
    let ended_at = Utc::now();

    let ingest_runs: Vec<SourceRun> = store
        .list_source_runs_for_group(&run_group_id)?
        .into_iter()
        .filter(|r| r.phase == RunPhase::Ingest)
        .collect();
    let (stale_ids, source_health) = stale_source_ids(store.as_ref(), &cfg, ended_at);

    let mut warnings = Vec::new();
    let errors = Vec::new();
    if ingest_summary.errors > 0 {
        warnings.push(format!("{} item(s) failed during ingest", ingest_summary.errors));
    }

    let record = RunRecord {
        run_id: run_group_id.clone(),
        operator_id: "hardstop.run@1.0.0".to_string(),
        mode: run_mode(strict),
        started_at: format_z(started_at),
        ended_at: format_z(ended_at),
        config_hash: config_hash(paths)?,
        input_refs: Vec::new(),
        output_refs: incident_evidence_output_refs(&ingest_summary.incident_evidence_paths),
        warnings,
        errors,
        best_effort: if strict { None } else { Some(best_effort) },
        cost: None,
        artifact_hash: None,
    };
    let record_path = emit_run_record(paths.run_records_dir(), record.clone(), None, None)?;

    let status_inputs = RunStatusInputs {
        fetch_results,
        ingest_runs,
        doctor_findings: Vec::new(),
        stale_source_ids: stale_ids,
        enabled_source_count: cfg.sources.enabled_sources().count(),
        config_parse_error: false,
        schema_drift_detected: false,
        source_health,
        strict,
    };
    let status = evaluate_run_status(&status_inputs);
    info!(exit_code = status.exit_code, "run complete");

    print_json(&json!({
        "run_record_path": record_path,
        "run_record": record,
        "fetch_results": fetch_summaries,
        "ingest_summary": ingest_summary,
        "status": status,
    }))?;
    Ok(status.exit_code)
}

fn cmd_brief(paths: &Paths, since_hours: i64, top: usize) -> Result<i32> {
    let _cfg = bootstrap::load_config(paths)?;
    let store = bootstrap::open_store(paths)?;
    let since_utc = format_z(Utc::now() - chrono::Duration::hours(since_hours));
    let brief = build_brief(store.as_ref(), &since_utc, since_hours, top)?;
    print_json(&brief)?;
    Ok(0)
}

fn suppression_findings(cfg: &HardstopConfig) -> Vec<String> {
    let mut findings = Vec::new();
    let mut check = |id: &str, pattern: &str| {
        if regex::Regex::new(pattern).is_err() {
            findings.push(format!("invalid regex in suppression rule {id}: {pattern}"));
        }
    };
    for rule in &cfg.suppression.rules {
        if rule.kind == crate::suppression::SuppressionKind::Regex {
            check(&rule.id, &rule.pattern);
        }
    }
    for source in &cfg.sources.sources {
        for rule in &source.suppression {
            if rule.kind == crate::suppression::SuppressionKind::Regex {
                check(&rule.id, &rule.pattern);
            }
        }
    }
    findings
}

fn cmd_doctor(paths: &Paths) -> Result<i32> {
    let cfg = bootstrap::load_config(paths)?;
    let store = bootstrap::open_store(paths)?;
    let now = Utc::now();

    let findings = suppression_findings(&cfg);
    let (stale_ids, source_health) = stale_source_ids(store.as_ref(), &cfg, now);

    let blocked: Vec<&SourceHealthSummary> =
        source_health.iter().filter(|h| h.bucket == crate::health::HealthBucket::Blocked).collect();
    let watch: Vec<&SourceHealthSummary> = source_health.iter().filter(|h| h.bucket == crate::health::HealthBucket::Watch).collect();

    let suggestion = if cfg.sources.enabled_sources().count() == 0 {
        "no sources enabled: add at least one source to sources.toml".to_string()
    } else if !blocked.is_empty() {
        format!("source(s) exhausted failure budget: {} — check credentials/connectivity", blocked.iter().map(|h| h.source_id.as_str()).collect::<Vec<_>>().join(","))
    } else if !findings.is_empty() {
        "fix invalid suppression rule patterns in suppression.toml/sources.toml".to_string()
    } else if !stale_ids.is_empty() {
        format!("source(s) stale: {} — run `hardstop fetch`", stale_ids.join(","))
    } else if !watch.is_empty() {
        "some sources are in WATCH; monitor before they degrade further".to_string()
    } else {
        "all checks passed".to_string()
    };

    print_json(&json!({
        "findings": findings,
        "stale_source_ids": stale_ids,
        "source_health": source_health.iter().map(|h| json!({"source_id": h.source_id, "bucket": format!("{:?}", h.bucket)})).collect::<Vec<_>>(),
        "suggestion": suggestion,
    }))?;
    Ok(0)
}

fn cmd_incidents(paths: &Paths, action: IncidentsAction) -> Result<i32> {
    match action {
        IncidentsAction::Replay { alert_id, event_id, correlation_key } => cmd_incidents_replay(paths, alert_id, event_id, correlation_key),
    }
}

fn load_incident_evidence_files(dir: &Path) -> Result<Vec<(PathBuf, IncidentEvidence)>> {
    let mut out = Vec::new();
    let incidents_dir = dir.join("incidents");
    if !incidents_dir.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(&incidents_dir).context("reading incidents directory")? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let contents = std::fs::read_to_string(&path)?;
        if let Ok(evidence) = serde_json::from_str::<IncidentEvidence>(&contents) {
            out.push((path, evidence));
        }
    }
    Ok(out)
}

fn find_referencing_run_record(dir: &Path, artifact_hash_value: &str) -> Result<Option<RunRecord>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut candidates: Vec<RunRecord> = Vec::new();
    for entry in std::fs::read_dir(dir).context("reading output directory")? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let contents = std::fs::read_to_string(&path)?;
        if let Ok(record) = serde_json::from_str::<RunRecord>(&contents) {
            if record.output_refs.iter().any(|r: &ArtifactRef| r.hash == artifact_hash_value) {
                candidates.push(record);
            }
        }
    }
    candidates.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(candidates.into_iter().next())
}

fn cmd_incidents_replay(
    paths: &Paths,
    alert_id: Option<String>,
    event_id: Option<String>,
    correlation_key: Option<String>,
) -> Result<i32> {
    let candidates = load_incident_evidence_files(&paths.output_dir)?;
    let mut matching: Vec<(PathBuf, IncidentEvidence)> = candidates
        .into_iter()
        .filter(|(_, e)| alert_id.as_deref().map(|id| e.inputs.existing_alert_id == id).unwrap_or(true))
        .filter(|(_, e)| event_id.as_deref().map(|id| e.inputs.incoming_event_id == id).unwrap_or(true))
        .filter(|(_, e)| correlation_key.as_deref().map(|key| e.correlation_key == key).unwrap_or(true))
        .collect();
    matching.sort_by(|a, b| b.1.generated_at_utc.cmp(&a.1.generated_at_utc));

    let Some((path, evidence)) = matching.into_iter().next() else {
        print_json(&json!({ "found": false }))?;
        return Ok(2);
    };

    let current_hash = config_hash(paths)?;
    let referencing = match evidence.artifact_hash.as_deref() {
        Some(hash) => find_referencing_run_record(&paths.output_dir, hash)?,
        None => None,
    };
    let issues = replay_check(&evidence, referencing.as_ref().map(|r| r.config_hash.as_str()), &current_hash);

    print_json(&json!({
        "found": true,
        "artifact_path": path,
        "issues": issues.iter().map(|i| format!("{i:?}")).collect::<Vec<_>>(),
    }))?;
    Ok(if issues.is_empty() { 0 } else { 1 })
}

fn cmd_sources(paths: &Paths, action: SourcesAction) -> Result<i32> {
    let cfg = bootstrap::load_config(paths)?;
    match action {
        SourcesAction::List => {
            print_json(&cfg.sources.sources)?;
            Ok(0)
        }
        SourcesAction::Test { source, since_hours } => {
            let strict = cfg.runtime.strict;
            let fetcher = SourceFetcher::new(strict, rng_seed(&cfg, strict));
            let result = fetcher.fetch_one_named(&cfg.sources, &source, since_hours, None);
            match result {
                Some(result) => {
                    let ok = result.status == RunOutcome::Success;
                    print_json(&json!({
                        "source_id": result.source_id,
                        "status": result.status,
                        "items": result.items.len(),
                        "status_code": result.status_code,
                        "error": result.error,
                    }))?;
                    Ok(if ok { 0 } else { 1 })
                }
                None => Err(anyhow!("unknown source: {source}")),
            }
        }
        SourcesAction::Health { source, lookback } => {
            let store = bootstrap::open_store(paths)?;
            let now = Utc::now();
            let ids: Vec<String> = match source {
                Some(id) => vec![id],
                None => cfg.sources.enabled_sources().map(|s| s.id.clone()).collect(),
            };
            let mut results = Vec::new();
            for id in ids {
                let health = evaluate_source_health(store.as_ref(), &id, lookback, now, cfg.runtime.stale_hours as f64)?;
                results.push(json!({
                    "source_id": health.source_id,
                    "score": health.score,
                    "bucket": format!("{:?}", health.bucket),
                }));
            }
            print_json(&results)?;
            Ok(0)
        }
    }
}

fn cmd_export(paths: &Paths, action: ExportAction) -> Result<i32> {
    std::fs::create_dir_all(&paths.output_dir).context("creating output directory")?;
    match action {
        ExportAction::Brief { since_hours, top } => {
            let _cfg = bootstrap::load_config(paths)?;
            let store = bootstrap::open_store(paths)?;
            let since_utc = format_z(Utc::now() - chrono::Duration::hours(since_hours));
            let brief = build_brief(store.as_ref(), &since_utc, since_hours, top)?;
            let path = paths.output_dir.join("brief.json");
            std::fs::write(&path, serde_json::to_string_pretty(&brief)?)?;
            print_json(&json!({ "path": path, "brief": brief }))?;
            Ok(0)
        }
        ExportAction::Alerts => {
            let store = bootstrap::open_store(paths)?;
            let alerts = store.list_alerts()?;
            let path = paths.output_dir.join("alerts.json");
            std::fs::write(&path, serde_json::to_string_pretty(&alerts)?)?;
            print_json(&json!({ "path": path, "count": alerts.len() }))?;
            Ok(0)
        }
        ExportAction::Sources => {
            let cfg = bootstrap::load_config(paths)?;
            let path = paths.output_dir.join("sources.json");
            std::fs::write(&path, serde_json::to_string_pretty(&cfg.sources)?)?;
            print_json(&json!({ "path": path }))?;
            Ok(0)
        }
    }
}

fn write_default_toml<T: Serialize>(path: &Path, value: &T, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    let body = toml::to_string_pretty(value).context("serializing default config")?;
    std::fs::write(path, body)?;
    Ok(true)
}

fn cmd_init(paths: &Paths, force: bool) -> Result<i32> {
    std::fs::create_dir_all(&paths.config_dir)?;
    std::fs::create_dir_all(&paths.data_dir)?;
    std::fs::create_dir_all(&paths.fixtures_dir)?;
    std::fs::create_dir_all(&paths.output_dir)?;

    let mut written = Vec::new();
    if write_default_toml(&paths.runtime_toml(), &crate::config::RuntimeConfig::default(), force)? {
        written.push(paths.runtime_toml());
    }
    if write_default_toml(&paths.sources_toml(), &crate::config::SourcesConfig::default(), force)? {
        written.push(paths.sources_toml());
    }
    if write_default_toml(&paths.suppression_toml(), &crate::config::SuppressionConfig::default(), force)? {
        written.push(paths.suppression_toml());
    }
    if write_default_toml(&paths.keywords_toml(), &crate::config::RiskKeywordConfig::default(), force)? {
        written.push(paths.keywords_toml());
    }

    print_json(&json!({ "written": written }))?;
    Ok(0)
}
