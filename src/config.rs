use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for continuation-fetch
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContinuationFetchConfig {
    /// Simulated profile lookup (step 1)
    pub profile_lookup: LookupConfig,
    /// Simulated image lookup (step 2)
    pub image_lookup: LookupConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Simulated latency of one lookup
    pub latency_ms: u64,
    /// Fail the lookup with a timeout when latency exceeds this
    pub timeout_ms: Option<u64>,
    /// Keys that resolve; empty means every key resolves
    pub known_keys: Vec<u64>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            latency_ms: 100,
            timeout_ms: None,
            known_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

pub const CONFIG_FILE: &str = "continuation-fetch.toml";
pub const ENV_PREFIX: &str = "CONTINUATION_FETCH";

impl ContinuationFetchConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. continuation-fetch.toml in the working directory
    /// 3. Environment variables (CONTINUATION_FETCH_<SECTION>__<KEY>)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Same as [`load`](Self::load) with an explicit file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
