use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::chains::{CircuitBreakerConfig, RetryConfig};
use crate::models::{ChainConfig, ChainRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    pub timeout_seconds: u64,
    /// Attempts made against each endpoint before moving to the next one.
    pub attempts_per_endpoint: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout_seconds: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            attempts_per_endpoint: 1,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            failure_threshold: 3,
            success_threshold: 1,
            open_timeout_seconds: 60,
        }
    }
}

impl RpcSettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.attempts_per_endpoint,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout_duration: Duration::from_secs(self.open_timeout_seconds),
        }
    }
}

/// Registry adjustments loaded from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainOverrides {
    /// Chain id -> replacement RPC list.
    #[serde(default)]
    pub rpcs: HashMap<String, Vec<String>>,
    /// Extra chains, or full replacements for built-in ids.
    #[serde(default)]
    pub custom: Vec<ChainConfig>,
}

impl ChainOverrides {
    /// Returns ids in `rpcs` that match no chain once custom chains are added.
    pub fn apply(&self, registry: &mut ChainRegistry) -> Vec<String> {
        for chain in &self.custom {
            registry.upsert(chain.clone());
        }

        let mut unknown: Vec<String> = self
            .rpcs
            .iter()
            .filter(|(id, urls)| !registry.set_rpcs(id, (*urls).clone()))
            .map(|(id, _)| id.clone())
            .collect();
        unknown.sort();
        unknown
    }
}
