//! RunRecord emission, config fingerprinting, and the shared artifact-hash
//! primitive, per spec.md §4.10.
//!
//! Grounded in `hardstop/ops/run_record.py`: canonical JSON (sorted keys,
//! compact separators) and `artifact_hash = SHA-256(canonical_json(payload
//! with artifact_hash removed))`.

pub mod incident_evidence;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::canonical::{canonical_json, sha256_hex};
use crate::config::{load_runtime_config, load_sources_config, load_suppression_config};
use crate::time_utils::CanonicalizeTime;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Reference to an output artifact a RunRecord points at (an IncidentEvidence
/// file, a brief export, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRef {
    pub id: String,
    pub kind: String,
    pub hash: String,
    pub schema: Option<String>,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Strict,
    BestEffort,
}

/// Operator-level run envelope emitted per CLI operation, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub operator_id: String,
    pub mode: RunMode,
    pub started_at: String,
    pub ended_at: String,
    pub config_hash: String,
    pub input_refs: Vec<ArtifactRef>,
    pub output_refs: Vec<ArtifactRef>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_effort: Option<crate::fetcher::BestEffortMetadata>,
    pub cost: Option<Value>,
    /// Present only when computed by [`artifact_hash`]; `None` before
    /// first hashing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_hash: Option<String>,
}

/// SHA-256 of the canonical JSON of `value` with its own `artifact_hash`
/// field removed (or absent), per spec.md §4.10.
pub fn artifact_hash<T: Serialize>(value: &T) -> Result<String, ArtifactError> {
    let mut as_value = serde_json::to_value(value).map_err(|e| ArtifactError::Serialization(e.to_string()))?;
    if let Some(obj) = as_value.as_object_mut() {
        obj.remove("artifact_hash");
    }
    let canonical = canonical_json(&as_value).map_err(|e| ArtifactError::Serialization(e.to_string()))?;
    Ok(sha256_hex(&canonical))
}

/// `config_hash`: SHA-256 of the canonical JSON of `{runtime, sources,
/// suppression}`, each loaded best-effort (missing file → empty/default
/// document).
pub fn fingerprint_config(
    runtime_path: impl AsRef<Path>,
    sources_path: impl AsRef<Path>,
    suppression_path: impl AsRef<Path>,
) -> Result<String, ArtifactError> {
    let runtime = load_runtime_config(runtime_path)?;
    let sources = load_sources_config(sources_path)?;
    let suppression = load_suppression_config(suppression_path)?;
    let snapshot = serde_json::json!({
        "runtime": runtime,
        "sources": sources,
        "suppression": suppression,
    });
    let canonical = canonical_json(&snapshot).map_err(|e| ArtifactError::Serialization(e.to_string()))?;
    Ok(sha256_hex(&canonical))
}

fn compact_started_at(started_at: &str) -> String {
    started_at.replace(['-', ':'], "")
}

/// Writes a RunRecord as one JSON file under `dest_dir`. When `basename` is
/// given the file is `<basename>.json` (deterministic replay naming);
/// otherwise `<compact-started-at>_<run_id>.json`. `canonicalize_time`, if
/// set, is applied to `started_at`/`ended_at` before serialization so
/// replays can match bit-for-bit.
pub fn emit_run_record(
    dest_dir: impl AsRef<Path>,
    mut record: RunRecord,
    basename: Option<&str>,
    canonicalize_time: Option<&CanonicalizeTime>,
) -> Result<PathBuf, ArtifactError> {
    if let Some(strategy) = canonicalize_time {
        if let Some(dt) = crate::time_utils::parse_z(&record.started_at) {
            record.started_at = crate::time_utils::format_z(strategy.apply(dt));
        }
        if let Some(dt) = crate::time_utils::parse_z(&record.ended_at) {
            record.ended_at = crate::time_utils::format_z(strategy.apply(dt));
        }
    }
    record.artifact_hash = None;
    let hash = artifact_hash(&record)?;
    record.artifact_hash = Some(hash);

    let dest_dir = dest_dir.as_ref();
    std::fs::create_dir_all(dest_dir).map_err(|e| ArtifactError::Io(e.to_string()))?;
    let filename = match basename {
        Some(basename) => format!("{basename}.json"),
        None => format!("{}_{}.json", compact_started_at(&record.started_at), record.run_id),
    };
    let path = dest_dir.join(filename);
    let body = serde_json::to_string_pretty(&record).map_err(|e| ArtifactError::Serialization(e.to_string()))?;
    std::fs::write(&path, body).map_err(|e| ArtifactError::Io(e.to_string()))?;
    Ok(path)
}
