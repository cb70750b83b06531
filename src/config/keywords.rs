//! Weighted risk keyword list used by the impact scorer's keyword scan,
//! grounded in `hardstop/alerts/impact_scorer.py::DEFAULT_RISK_KEYWORDS`.
//! A configured list fully replaces the default rather than merging with
//! it, matching the original's fallback-only semantics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskKeywordConfig {
    pub weights: HashMap<String, i32>,
}

impl Default for RiskKeywordConfig {
    fn default() -> Self {
        Self {
            weights: default_risk_keywords(),
        }
    }
}

pub fn default_risk_keywords() -> HashMap<String, i32> {
    let pairs: &[(&str, i32)] = &[
        ("spill", 1),
        ("strike", 1),
        ("closure", 1),
        ("closed", 1),
        ("shutdown", 1),
    ];
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}
