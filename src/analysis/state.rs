use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::{
    chains::FanoutClient,
    models::{ChainConfig, ChainFamily, ChainScopeError, Result, SnapshotCache},
};

/// Number of evenly spaced blocks sampled when no explicit blocks are given.
pub const DEFAULT_HISTORY_INTERVALS: u64 = 10;

/// ETH fee token on Starknet mainnet. Balances are read through its `balanceOf`.
pub const STARKNET_ETH_TOKEN: &str =
    "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";

/// `starknet_keccak("balanceOf")`
pub const BALANCE_OF_SELECTOR: &str =
    "0x2e4263afad30923c891518314c3c95dbe830a16874e8abc5777a9a20b54c76e";

/// Balance and implementation of a contract at one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractState {
    /// Decimal balance in the chain's smallest unit.
    pub balance: String,
    /// Starknet class hash. EVM contracts have none.
    pub class_hash: Option<String>,
    pub block_number: u64,
    /// Milliseconds since the epoch when the state was fetched.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StateChange {
    Balance {
        from: u64,
        to: u64,
        change: String,
        direction: BalanceDirection,
    },
    Upgrade {
        from: u64,
        to: u64,
        #[serde(rename = "oldHash")]
        old_hash: Option<String>,
        #[serde(rename = "newHash")]
        new_hash: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAnalysis {
    pub changes: Vec<StateChange>,
    pub insights: Vec<String>,
}

/// Samples contract state across blocks through the fan-out client and
/// keeps every sample in the shared cache.
pub struct StateAnalyzer {
    client: Arc<FanoutClient>,
    cache: SnapshotCache,
}

impl StateAnalyzer {
    pub fn new(client: Arc<FanoutClient>, cache: SnapshotCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Analyzes `address` at `intervals` evenly spaced blocks ending at the
    /// chain head.
    pub async fn analyze_recent(
        &self,
        chain: &ChainConfig,
        address: &str,
        intervals: u64,
    ) -> Result<StateAnalysis> {
        let latest = self.client.latest_block_number(chain).await?;
        let blocks = historical_blocks(latest, intervals);
        self.analyze_contract_state(chain, address, &blocks).await
    }

    /// Loads the state of `address` at each block, cached first, and compares
    /// consecutive samples. Blocks whose state cannot be fetched are skipped.
    pub async fn analyze_contract_state(
        &self,
        chain: &ChainConfig,
        address: &str,
        blocks: &[u64],
    ) -> Result<StateAnalysis> {
        if !matches!(chain.family, ChainFamily::Evm | ChainFamily::Starknet) {
            return Err(ChainScopeError::UnsupportedChainFamily(
                chain.family.as_str().to_string(),
            ));
        }

        let key = state_key(chain, address);
        let mut states = Vec::with_capacity(blocks.len());

        for &block in blocks {
            if let Some(state) = self.cached_state(&key, block) {
                debug!("State cache hit for {} at block {}", key, block);
                states.push(state);
                continue;
            }

            match self.fetch_state(chain, address, block).await {
                Ok(state) => {
                    self.cache.save_state(&key, block, serde_json::to_value(&state)?);
                    states.push(state);
                }
                Err(e) => {
                    error!("Failed to fetch state at block {}: {}", block, e);
                }
            }
        }

        Ok(analyze_state_changes(&states))
    }

    fn cached_state(&self, key: &str, block: u64) -> Option<ContractState> {
        let value = self.cache.state_at(key, block)?;
        match serde_json::from_value(value) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring unreadable cached state for {} at {}: {}", key, block, e);
                None
            }
        }
    }

    async fn fetch_state(
        &self,
        chain: &ChainConfig,
        address: &str,
        block: u64,
    ) -> Result<ContractState> {
        let (balance, class_hash) = match chain.family {
            ChainFamily::Evm => {
                let result = self
                    .client
                    .call(chain, "eth_getBalance", json!([address, format!("{:#x}", block)]))
                    .await?;
                (parse_quantity(chain, &result)?, None)
            }
            ChainFamily::Starknet => {
                let block_id = json!({ "block_number": block });
                let call = json!({
                    "contract_address": STARKNET_ETH_TOKEN,
                    "entry_point_selector": BALANCE_OF_SELECTOR,
                    "calldata": [address],
                });
                let result = self
                    .client
                    .call(chain, "starknet_call", json!([call, block_id.clone()]))
                    .await?;
                let balance = parse_u256(chain, &result)?;

                let result = self
                    .client
                    .call(chain, "starknet_getClassHashAt", json!([block_id, address]))
                    .await?;
                let class_hash = result.as_str().map(str::to_string).ok_or_else(|| {
                    unexpected(chain, format!("invalid class hash: {}", result))
                })?;

                (balance, Some(class_hash))
            }
            other => {
                return Err(ChainScopeError::UnsupportedChainFamily(
                    other.as_str().to_string(),
                ))
            }
        };

        Ok(ContractState {
            balance: balance.to_string(),
            class_hash,
            block_number: block,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}

fn state_key(chain: &ChainConfig, address: &str) -> String {
    format!("{}:{}", chain.id, address)
}

fn unexpected(chain: &ChainConfig, message: String) -> ChainScopeError {
    ChainScopeError::UnexpectedResponse {
        chain: chain.id.clone(),
        message,
    }
}

fn parse_quantity(chain: &ChainConfig, value: &Value) -> Result<u128> {
    let s = value
        .as_str()
        .ok_or_else(|| unexpected(chain, format!("expected hex quantity, got {}", value)))?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| unexpected(chain, format!("invalid quantity {:?}: {}", s, e)))
}

/// `balanceOf` returns a u256 as `[low, high]` felts.
fn parse_u256(chain: &ChainConfig, result: &Value) -> Result<u128> {
    let felts = result
        .as_array()
        .filter(|felts| felts.len() == 2)
        .ok_or_else(|| {
            unexpected(chain, format!("expected [low, high] balance, got {}", result))
        })?;

    let low = parse_quantity(chain, &felts[0])?;
    let high = parse_quantity(chain, &felts[1])?;
    if high != 0 {
        return Err(unexpected(chain, "balance exceeds 128 bits".to_string()));
    }
    Ok(low)
}

/// Compares consecutive states: non-zero balance deltas and class hash
/// changes become [`StateChange`]s, with a total-delta insight at the end.
pub fn analyze_state_changes(states: &[ContractState]) -> StateAnalysis {
    let mut analysis = StateAnalysis::default();
    if states.len() < 2 {
        return analysis;
    }

    let mut total: i128 = 0;
    let mut balance_changes = 0usize;

    for pair in states.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        match (prev.balance.parse::<i128>(), curr.balance.parse::<i128>()) {
            (Ok(before), Ok(after)) => {
                let delta = after - before;
                if delta != 0 {
                    total += delta;
                    balance_changes += 1;
                    analysis.changes.push(StateChange::Balance {
                        from: prev.block_number,
                        to: curr.block_number,
                        change: delta.to_string(),
                        direction: if delta > 0 {
                            BalanceDirection::Increase
                        } else {
                            BalanceDirection::Decrease
                        },
                    });
                }
            }
            _ => warn!(
                "Skipping balance comparison between blocks {} and {}",
                prev.block_number, curr.block_number
            ),
        }

        if prev.class_hash != curr.class_hash {
            analysis.changes.push(StateChange::Upgrade {
                from: prev.block_number,
                to: curr.block_number,
                old_hash: prev.class_hash.clone(),
                new_hash: curr.class_hash.clone(),
            });
            analysis
                .insights
                .push("Contract was upgraded - implementation changed".to_string());
        }
    }

    if balance_changes > 0 {
        analysis
            .insights
            .push(format!("Total balance change: {} wei", total));
    }

    analysis
}

/// `intervals` blocks spaced `latest / intervals` apart, oldest first and
/// ending at `latest`.
pub fn historical_blocks(latest: u64, intervals: u64) -> Vec<u64> {
    if intervals == 0 {
        return Vec::new();
    }
    let step = latest / intervals;
    let mut blocks: Vec<u64> = (0..intervals)
        .map(|i| latest.saturating_sub(i * step))
        .collect();
    blocks.reverse();
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::client::{MockRpcTransport, RpcResponse};

    fn chain(family: ChainFamily) -> ChainConfig {
        ChainConfig::new("testchain", "Test Chain", &["https://rpc"], family, "TST", "")
    }

    fn analyzer(transport: MockRpcTransport) -> StateAnalyzer {
        StateAnalyzer::new(
            Arc::new(FanoutClient::with_transport(Arc::new(transport))),
            SnapshotCache::default(),
        )
    }

    fn state(block: u64, balance: &str, class_hash: Option<&str>) -> ContractState {
        ContractState {
            balance: balance.to_string(),
            class_hash: class_hash.map(str::to_string),
            block_number: block,
            timestamp: 0,
        }
    }

    /// EVM transport answering `eth_getBalance` from a block -> balance table.
    fn evm_balances(balances: &'static [(u64, &'static str)]) -> MockRpcTransport {
        let mut transport = MockRpcTransport::new();
        transport
            .expect_post()
            .withf(|_, req| req.method == "eth_getBalance")
            .returning(move |_, req| {
                let block = req.params[1].as_str().unwrap_or_default().to_string();
                match balances.iter().find(|(n, _)| format!("{:#x}", n) == block) {
                    Some((_, balance)) => Ok(RpcResponse::success(json!(balance))),
                    None => Ok(RpcResponse::failure(-32000, "missing trie node")),
                }
            });
        transport
    }

    #[tokio::test]
    async fn test_balance_deltas_and_total() {
        let transport = evm_balances(&[(10, "0x64"), (20, "0x32"), (30, "0x96")]);
        let analysis = analyzer(transport)
            .analyze_contract_state(&chain(ChainFamily::Evm), "0xabc", &[10, 20, 30])
            .await
            .unwrap();

        assert_eq!(
            analysis.changes,
            vec![
                StateChange::Balance {
                    from: 10,
                    to: 20,
                    change: "-50".to_string(),
                    direction: BalanceDirection::Decrease,
                },
                StateChange::Balance {
                    from: 20,
                    to: 30,
                    change: "100".to_string(),
                    direction: BalanceDirection::Increase,
                },
            ]
        );
        assert_eq!(analysis.insights, vec!["Total balance change: 50 wei"]);
    }

    #[tokio::test]
    async fn test_failed_blocks_are_skipped() {
        // Block 20 is missing from the table and fails on every endpoint
        let transport = evm_balances(&[(10, "0x1"), (30, "0x5")]);
        let analyzer = analyzer(transport);
        let analysis = analyzer
            .analyze_contract_state(&chain(ChainFamily::Evm), "0xabc", &[10, 20, 30])
            .await
            .unwrap();

        assert_eq!(
            analysis.changes,
            vec![StateChange::Balance {
                from: 10,
                to: 30,
                change: "4".to_string(),
                direction: BalanceDirection::Increase,
            }]
        );
        assert_eq!(analyzer.cache().stats().state_entries, 2);
    }

    #[tokio::test]
    async fn test_cached_states_skip_the_network() {
        let mut transport = MockRpcTransport::new();
        transport
            .expect_post()
            .times(2)
            .returning(|_, _| Ok(RpcResponse::success(json!("0x10"))));

        let analyzer = analyzer(transport);
        let chain = chain(ChainFamily::Evm);

        let first = analyzer
            .analyze_contract_state(&chain, "0xabc", &[1, 2])
            .await
            .unwrap();
        let second = analyzer
            .analyze_contract_state(&chain, "0xabc", &[1, 2])
            .await
            .unwrap();

        assert_eq!(first, StateAnalysis::default());
        assert_eq!(second, first);
        assert_eq!(analyzer.cache().stats().state_entries, 2);
    }

    #[tokio::test]
    async fn test_starknet_upgrade_detection() {
        let mut transport = MockRpcTransport::new();
        transport
            .expect_post()
            .withf(|_, req| {
                req.method == "starknet_call"
                    && req.params[0]["entry_point_selector"] == json!(BALANCE_OF_SELECTOR)
                    && req.params[0]["calldata"] == json!(["0x0123"])
            })
            .times(2)
            .returning(|_, _| Ok(RpcResponse::success(json!(["0x3e8", "0x0"]))));
        transport
            .expect_post()
            .withf(|_, req| req.method == "starknet_getClassHashAt")
            .times(2)
            .returning(|_, req| {
                let hash = if req.params[0] == json!({"block_number": 100}) {
                    "0xaaa"
                } else {
                    "0xbbb"
                };
                Ok(RpcResponse::success(json!(hash)))
            });

        let analysis = analyzer(transport)
            .analyze_contract_state(&chain(ChainFamily::Starknet), "0x0123", &[100, 200])
            .await
            .unwrap();

        assert_eq!(
            analysis.changes,
            vec![StateChange::Upgrade {
                from: 100,
                to: 200,
                old_hash: Some("0xaaa".to_string()),
                new_hash: Some("0xbbb".to_string()),
            }]
        );
        assert_eq!(
            analysis.insights,
            vec!["Contract was upgraded - implementation changed"]
        );
    }

    #[tokio::test]
    async fn test_unsupported_family() {
        let transport = MockRpcTransport::new();
        let err = analyzer(transport)
            .analyze_contract_state(&chain(ChainFamily::Solana), "abc", &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, ChainScopeError::UnsupportedChainFamily(_)));
    }

    #[test]
    fn test_change_serialization() {
        let change = StateChange::Upgrade {
            from: 1,
            to: 2,
            old_hash: Some("0xa".to_string()),
            new_hash: Some("0xb".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({"type": "upgrade", "from": 1, "to": 2, "oldHash": "0xa", "newHash": "0xb"})
        );
    }

    #[test]
    fn test_single_state_has_no_changes() {
        assert_eq!(
            analyze_state_changes(&[state(1, "5", None)]),
            StateAnalysis::default()
        );
        assert_eq!(
            analyze_state_changes(&[state(1, "5", None), state(2, "5", None)]),
            StateAnalysis::default()
        );
    }

    #[test]
    fn test_u256_balances() {
        let chain = chain(ChainFamily::Starknet);
        assert_eq!(parse_u256(&chain, &json!(["0x3e8", "0x0"])).unwrap(), 1000);
        assert!(parse_u256(&chain, &json!(["0x1", "0x1"])).is_err());
        assert!(parse_u256(&chain, &json!("0x1")).is_err());
        assert_eq!(parse_quantity(&chain, &json!("0x0")).unwrap(), 0);
    }

    #[test]
    fn test_historical_blocks() {
        assert_eq!(
            historical_blocks(100, DEFAULT_HISTORY_INTERVALS),
            vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
        );
        assert_eq!(historical_blocks(105, 4), vec![27, 53, 79, 105]);
        assert_eq!(historical_blocks(3, 3), vec![1, 2, 3]);
        assert!(historical_blocks(100, 0).is_empty());
    }
}
