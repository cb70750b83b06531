//! Source definitions and fetch defaults (`sources.toml`).

use serde::{Deserialize, Serialize};

use crate::models::Tier;
use crate::suppression::SuppressionRule;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Rss,
    Atom,
    NwsAlerts,
    Fema,
    Ipaws,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub per_host_interval_ms: u64,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub max_items: usize,
    pub jitter_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_host_interval_ms: 1000,
            timeout_ms: 15_000,
            user_agent: "hardstop/0.1".to_string(),
            max_items: 100,
            jitter_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDef {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceKind,
    pub tier: Tier,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_trust_tier")]
    pub trust_tier: u8,
    #[serde(default)]
    pub classification_floor: u8,
    #[serde(default)]
    pub weighting_bias: i32,
    pub geo: Option<String>,
    pub max_items: Option<usize>,
    #[serde(default)]
    pub suppression: Vec<SuppressionRule>,
}

fn default_true() -> bool {
    true
}

fn default_trust_tier() -> u8 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub defaults: RateLimitConfig,
    pub sources: Vec<SourceDef>,
}

impl SourcesConfig {
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceDef> {
        self.sources.iter().filter(|s| s.enabled)
    }
}
