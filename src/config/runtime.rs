//! Runtime-level operational knobs (`hardstop.toml`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub operator_id: String,
    /// When true: fetch jitter/seed are pinned to 0 and IDs are generated
    /// via the deterministic context, for byte-reproducible runs.
    pub strict: bool,
    /// A source is considered stale once its last successful fetch is
    /// older than this many hours (feeds the health scorer and the run
    /// status evaluator).
    pub stale_hours: u32,
    /// Correlation upsert window, in days.
    pub correlation_window_days: i64,
    pub default_max_shipments: usize,
    /// How many recent `SourceRun` rows the health scorer looks back over.
    pub health_lookback_runs: usize,
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            operator_id: "default".to_string(),
            strict: false,
            stale_hours: 24,
            correlation_window_days: 7,
            default_max_shipments: 50,
            health_lookback_runs: 20,
            rng_seed: None,
        }
    }
}
