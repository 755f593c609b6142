//! Engine configuration with TOML file support.

use crate::error::EngineError;
use drawpool_random::HashChainSource;
use drawpool_types::{EngineParams, Timestamp};
use drawpool_utils::LogFormat;
use serde::{Deserialize, Serialize};

/// Configuration for an engine deployment.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Unix seconds at which epoch 1 opens. Defaults to the `now` the host passes in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<u64>,

    /// 32-byte hex seed for the hash-chain randomness source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomness_seed_hex: Option<String>,

    #[serde(default)]
    pub params: EngineParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.params
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, EngineError> {
        self.log_format
            .parse()
            .map_err(|e: String| EngineError::Config(e))
    }

    /// Install the global tracing subscriber described by this config.
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init_logging(&self) -> Result<bool, EngineError> {
        Ok(drawpool_utils::init_logging(self.log_format()?, &self.log_level))
    }

    /// Configured genesis, or `now` if none is set.
    pub fn genesis(&self, now: Timestamp) -> Timestamp {
        self.genesis_time.map(Timestamp::new).unwrap_or(now)
    }

    /// Hash-chain randomness from the configured seed, if one is set.
    pub fn randomness_source(&self) -> Result<Option<HashChainSource>, EngineError> {
        self.randomness_seed_hex
            .as_deref()
            .map(HashChainSource::from_hex_seed)
            .transpose()
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            genesis_time: None,
            randomness_seed_hex: None,
            params: EngineParams::default(),
        }
    }
}
