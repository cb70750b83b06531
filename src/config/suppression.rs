//! Global suppression rule set (`suppression.toml`).

use serde::{Deserialize, Serialize};

use crate::suppression::SuppressionRule;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuppressionConfig {
    pub enabled: bool,
    pub rules: Vec<SuppressionRule>,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: Vec::new(),
        }
    }
}
