use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    chains::{
        client::{HttpTransport, RpcRequest, RpcTransport},
        method::{translate_method, LogicalMethod},
        resilience::{retry_with_backoff, CircuitBreakerConfig, EndpointHealth, RetryConfig},
    },
    config::RpcSettings,
    models::{ChainConfig, ChainData, ChainFamily, ChainScopeError, EndpointFailure, Result},
};

/// Number of most recent blocks sampled for dashboard metrics.
pub const DASHBOARD_BLOCK_SAMPLE: u64 = 5;

/// Calls a chain's RPC endpoints in order and returns the first clean result.
pub struct FanoutClient {
    transport: Arc<dyn RpcTransport>,
    health: EndpointHealth,
    retry_config: RetryConfig,
    next_id: AtomicU64,
}

impl FanoutClient {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        retry_config: RetryConfig,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            transport,
            health: EndpointHealth::new(breaker_config),
            retry_config,
            next_id: AtomicU64::new(Utc::now().timestamp_millis().max(0) as u64),
        }
    }

    pub fn with_transport(transport: Arc<dyn RpcTransport>) -> Self {
        Self::new(transport, RetryConfig::default(), CircuitBreakerConfig::default())
    }

    pub fn from_settings(settings: &RpcSettings) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(settings.timeout_seconds))?;
        Ok(Self::new(
            Arc::new(transport),
            settings.retry_config(),
            settings.circuit_breaker_config(),
        ))
    }

    pub fn health(&self) -> &EndpointHealth {
        &self.health
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Translates `method` for the chain's family and tries every endpoint
    /// until one answers without a JSON-RPC error.
    pub async fn call(&self, chain: &ChainConfig, method: &str, params: Value) -> Result<Value> {
        let native = translate_method(chain.family, method);
        let request = RpcRequest::new(native, params, self.next_request_id());
        let mut attempts = Vec::with_capacity(chain.rpcs.len());

        for url in self.health.order(&chain.rpcs) {
            let breaker = self.health.breaker(url);
            let outcome = retry_with_backoff(&self.retry_config, url, || {
                self.call_endpoint(url, &request)
            })
            .await;

            match outcome {
                Ok(result) => {
                    breaker.record_success();
                    if !attempts.is_empty() {
                        info!(
                            "{} {} answered by {} after {} failed endpoint(s)",
                            chain.id,
                            request.method,
                            url,
                            attempts.len()
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    breaker.record_failure();
                    warn!("RPC call failed on {}: {}", url, e);
                    attempts.push(EndpointFailure {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        error!(
            "All {} RPC endpoints failed for {} ({})",
            attempts.len(),
            chain.id,
            request.method
        );
        Err(ChainScopeError::AllEndpointsFailed {
            chain: chain.id.clone(),
            attempts,
        })
    }

    async fn call_endpoint(&self, url: &str, request: &RpcRequest) -> Result<Value> {
        let response = self.transport.post(url, request).await?;
        response.into_result()
    }

    async fn call_logical(&self, chain: &ChainConfig, logical: LogicalMethod) -> Result<Value> {
        let (method, params) = logical.native_call(chain.family)?;
        self.call(chain, &method, params).await
    }

    pub async fn latest_block_number(&self, chain: &ChainConfig) -> Result<u64> {
        let result = self.call_logical(chain, LogicalMethod::BlockNumber).await?;
        parse_block_number(chain, &result)
    }

    pub async fn get_block(&self, chain: &ChainConfig, number: u64) -> Result<Value> {
        self.call_logical(chain, LogicalMethod::GetBlock(number)).await
    }

    /// Summarises the most recent blocks. Failures degrade to empty metrics.
    pub async fn dashboard_metrics(&self, chain: &ChainConfig) -> ChainData {
        if matches!(chain.family, ChainFamily::Cosmos | ChainFamily::Substrate) {
            return ChainData::empty();
        }

        let latest = match self.latest_block_number(chain).await {
            Ok(n) => n,
            Err(e) => {
                error!("Failed to fetch dashboard metrics for {}: {}", chain.id, e);
                return ChainData::empty();
            }
        };

        let numbers: Vec<u64> = (0..DASHBOARD_BLOCK_SAMPLE)
            .filter_map(|i| latest.checked_sub(i))
            .collect();
        let fetched = join_all(numbers.iter().map(|n| self.get_block(chain, *n))).await;

        let mut blocks = Vec::with_capacity(fetched.len());
        for (number, outcome) in numbers.iter().zip(fetched) {
            match outcome {
                Ok(Value::Null) => debug!("Block {} on {} is empty", number, chain.id),
                Ok(block) => blocks.push(block),
                Err(e) => warn!("Failed to fetch block {} on {}: {}", number, chain.id, e),
            }
        }

        ChainData::from_blocks(chain.family, &blocks, latest)
    }
}

/// EVM and Starknet endpoints report heights as hex strings (some Starknet
/// nodes return a bare integer); Solana returns the slot as an integer.
pub fn parse_block_number(chain: &ChainConfig, result: &Value) -> Result<u64> {
    let unexpected = |message: String| ChainScopeError::UnexpectedResponse {
        chain: chain.id.clone(),
        message,
    };

    match result {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| unexpected(format!("block number out of range: {}", n))),
        Value::String(s) => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u64::from_str_radix(digits, 16)
                .map_err(|e| unexpected(format!("invalid block number {:?}: {}", s, e)))
        }
        other => Err(unexpected(format!("invalid block number: {}", other))),
    }
}
