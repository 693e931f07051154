use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, File};
use std::path::Path;
use std::time::Duration;

use crate::config::{ChainOverrides, RpcSettings};
use crate::models::{ChainRegistry, DEFAULT_CHAIN_ID};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub rpc: RpcSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub chains: ChainOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub log_level: String,
    pub default_chain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub snapshot_max_age_seconds: u64,
}

impl CacheSettings {
    pub fn snapshot_max_age(&self) -> Duration {
        Duration::from_secs(self.snapshot_max_age_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                log_level: "info".to_string(),
                default_chain: DEFAULT_CHAIN_ID.to_string(),
            },
            rpc: RpcSettings::default(),
            cache: CacheSettings {
                snapshot_max_age_seconds: 300, // 5 minutes
            },
            chains: ChainOverrides::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CHAINSCOPE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?;

        s.try_deserialize()
    }

    /// Built-in chains with the configured overrides applied.
    pub fn registry(&self) -> ChainRegistry {
        let mut registry = ChainRegistry::default();
        self.chains.apply(&mut registry);
        registry
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rpc.timeout_seconds == 0 {
            return Err("RPC timeout must be greater than zero".to_string());
        }

        if self.rpc.attempts_per_endpoint == 0 {
            return Err("At least one attempt per endpoint is required".to_string());
        }

        if self.rpc.backoff_multiplier < 1.0 {
            return Err(format!(
                "Backoff multiplier must be at least 1.0, got {}",
                self.rpc.backoff_multiplier
            ));
        }

        if self.rpc.failure_threshold == 0 || self.rpc.success_threshold == 0 {
            return Err("Circuit breaker thresholds must be greater than zero".to_string());
        }

        let mut registry = ChainRegistry::default();
        let unknown = self.chains.apply(&mut registry);
        if !unknown.is_empty() {
            return Err(format!("RPC overrides reference unknown chains: {}", unknown.join(", ")));
        }

        if let Some(chain) = registry.chains().iter().find(|c| c.rpcs.is_empty()) {
            return Err(format!("Chain {} has no RPC endpoints", chain.id));
        }

        if registry.get(&self.app.default_chain).is_none() {
            return Err(format!("Unknown default chain: {}", self.app.default_chain));
        }

        Ok(())
    }
}
