//! Config/fixture loading and store construction shared by every
//! subcommand. Isolated from `ops.rs` so each command reads as "load,
//! then act" rather than re-deriving the loading dance inline.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::cli::paths::Paths;
use crate::config::{
    self, load_keyword_config, load_runtime_config, load_sources_config, load_suppression_config, HardstopConfig,
};
use crate::config::network::{load_facilities_csv, load_lanes_csv, load_shipments_csv};
use crate::models::{Facility, Lane, Shipment};
use crate::store::{SledStore, Store};

pub struct Fixtures {
    pub facilities: Vec<Facility>,
    pub lanes: Vec<Lane>,
    pub shipments: Vec<Shipment>,
}

/// Loads the four config documents and installs them in the process-wide
/// singleton (idempotent across a single CLI invocation — each binary run
/// calls this exactly once).
pub fn load_config(paths: &Paths) -> Result<HardstopConfig> {
    let runtime = load_runtime_config(paths.runtime_toml()).context("loading hardstop.toml")?;
    let sources = load_sources_config(paths.sources_toml()).context("loading sources.toml")?;
    let suppression = load_suppression_config(paths.suppression_toml()).context("loading suppression.toml")?;
    let keywords = load_keyword_config(paths.keywords_toml()).context("loading keywords.toml")?;
    let cfg = HardstopConfig { runtime, sources, suppression, keywords };
    if !config::is_initialized() {
        config::init(cfg.clone()).ok();
    }
    Ok(cfg)
}

/// Network fixtures are an external collaborator (spec.md §6): a missing
/// CSV file means "no reference data available", not an error.
pub fn load_fixtures(paths: &Paths) -> Fixtures {
    Fixtures {
        facilities: load_facilities_csv(paths.facilities_csv()).unwrap_or_default(),
        lanes: load_lanes_csv(paths.lanes_csv()).unwrap_or_default(),
        shipments: load_shipments_csv(paths.shipments_csv()).unwrap_or_default(),
    }
}

pub fn keyword_weights(cfg: &HardstopConfig) -> HashMap<String, i32> {
    cfg.keywords.weights.clone()
}

pub fn open_store(paths: &Paths) -> Result<Box<dyn Store>> {
    std::fs::create_dir_all(&paths.data_dir).context("creating data directory")?;
    let store = SledStore::open(paths.sled_path()).context("opening sled store")?;
    Ok(Box::new(store))
}
