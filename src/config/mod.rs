//! Configuration loading and global state.
//!
//! # Loading order
//!
//! 1. `load_runtime_config`/`load_sources_config`/`load_suppression_config`
//!    each accept an explicit path and are best-effort: a missing file
//!    yields the type's `Default`, a malformed one is a hard
//!    [`ConfigError::Parse`].
//! 2. [`init`] combines the three documents (plus the risk-keyword list)
//!    into one [`HardstopConfig`] and installs it in a process-wide
//!    [`OnceLock`], mirroring the teacher's `WellConfig` singleton.
//! 3. [`get`] retrieves the installed config; panics if [`init`] was never
//!    called, since every entry point is expected to call it first.
//!
//! # Usage
//!
//! The artifact layer (`config_hash`, see `artifacts::fingerprint_config`)
//! additionally reloads runtime/sources/suppression independent of global
//! state, so that hashing a run's config snapshot doesn't depend on
//! whatever happens to be installed at hash time.

pub mod keywords;
pub mod network;
pub mod runtime;
pub mod sources;
pub mod suppression;

pub use keywords::RiskKeywordConfig;
pub use runtime::RuntimeConfig;
pub use sources::{RateLimitConfig, SourceDef, SourceKind, SourcesConfig};
pub use suppression::SuppressionConfig;

use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("config already initialized")]
    AlreadyInitialized,
    #[error("config not initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, Default)]
pub struct HardstopConfig {
    pub runtime: RuntimeConfig,
    pub sources: SourcesConfig,
    pub suppression: SuppressionConfig,
    pub keywords: RiskKeywordConfig,
}

static CONFIG: OnceLock<HardstopConfig> = OnceLock::new();

/// Best-effort TOML load: a missing file yields `T::default()`; a present
/// but malformed file is a hard error.
fn load_toml_best_effort<T>(path: &Path) -> Result<T, ConfigError>
where
    T: Default + serde::de::DeserializeOwned,
{
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(ConfigError::Io(e.to_string())),
    }
}

pub fn load_runtime_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    load_toml_best_effort(path.as_ref())
}

pub fn load_sources_config(path: impl AsRef<Path>) -> Result<SourcesConfig, ConfigError> {
    load_toml_best_effort(path.as_ref())
}

pub fn load_suppression_config(path: impl AsRef<Path>) -> Result<SuppressionConfig, ConfigError> {
    load_toml_best_effort(path.as_ref())
}

pub fn load_keyword_config(path: impl AsRef<Path>) -> Result<RiskKeywordConfig, ConfigError> {
    load_toml_best_effort(path.as_ref())
}

/// Installs the process-wide config singleton. Returns an error if a
/// config was already installed (matches the teacher's `init()` contract
/// — configuration is loaded once at startup, not hot-reloaded).
pub fn init(config: HardstopConfig) -> Result<(), ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

pub fn get() -> &'static HardstopConfig {
    CONFIG.get().expect("config::init must be called before config::get")
}

pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}
