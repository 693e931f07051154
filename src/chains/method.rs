use serde_json::{json, Value};

use crate::models::{ChainFamily, ChainScopeError, Result};

/// Rewrites a method name into the dialect spoken by `family`.
///
/// EVM and Starknet swap the first `eth_`/`starknet_` prefix occurrence,
/// Solana maps the block queries onto `getSlot`/`getBlock`, and every other
/// family passes the name through untouched.
pub fn translate_method(family: ChainFamily, method: &str) -> String {
    match family {
        ChainFamily::Starknet => method.replacen("eth_", "starknet_", 1),
        ChainFamily::Evm => method.replacen("starknet_", "eth_", 1),
        ChainFamily::Solana => solana_method(method).to_string(),
        ChainFamily::Cosmos | ChainFamily::Substrate => method.to_string(),
    }
}

fn solana_method(method: &str) -> &str {
    match method {
        "eth_blockNumber" | "starknet_blockNumber" => "getSlot",
        "eth_getBlockByNumber" | "starknet_getBlockWithTxs" => "getBlock",
        other => other,
    }
}

/// Chain-agnostic queries with a known native method and parameter shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalMethod {
    BlockNumber,
    GetBlock(u64),
}

impl LogicalMethod {
    pub fn native_call(&self, family: ChainFamily) -> Result<(String, Value)> {
        let call = match (self, family) {
            (LogicalMethod::BlockNumber, ChainFamily::Starknet) => {
                ("starknet_blockNumber", json!([]))
            }
            (LogicalMethod::BlockNumber, ChainFamily::Evm) => ("eth_blockNumber", json!([])),
            (LogicalMethod::BlockNumber, ChainFamily::Solana) => ("getSlot", json!([])),
            (LogicalMethod::GetBlock(n), ChainFamily::Starknet) => {
                ("starknet_getBlockWithTxs", json!([{ "block_number": n }]))
            }
            (LogicalMethod::GetBlock(n), ChainFamily::Evm) => {
                ("eth_getBlockByNumber", json!([format!("{:#x}", n), true]))
            }
            (LogicalMethod::GetBlock(n), ChainFamily::Solana) => (
                "getBlock",
                json!([n, {
                    "transactionDetails": "full",
                    "maxSupportedTransactionVersion": 0
                }]),
            ),
            (_, ChainFamily::Cosmos | ChainFamily::Substrate) => {
                return Err(ChainScopeError::UnsupportedChainFamily(
                    family.as_str().to_string(),
                ))
            }
        };

        Ok((call.0.to_string(), call.1))
    }
}
