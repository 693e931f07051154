use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

/// Analysis results captured for a contract at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub id: String,
    pub contract_address: String,
    pub contract_name: String,
    pub events: Vec<Value>,
    pub stats: Value,
    pub contract_info: Value,
    pub block_range: BlockRange,
    pub timestamp: DateTime<Utc>,
}

impl ContractSnapshot {
    pub fn new(
        contract_address: &str,
        contract_name: &str,
        events: Vec<Value>,
        stats: Value,
        contract_info: Value,
        block_range: BlockRange,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            id: format!("{}_{}", contract_address, timestamp.timestamp_millis()),
            contract_address: contract_address.to_string(),
            contract_name: contract_name.to_string(),
            events,
            stats,
            contract_info,
            block_range,
            timestamp,
        }
    }

    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_older_than(&self, max_age: Duration) -> bool {
        self.age() >= max_age
    }
}

/// In-memory store for contract snapshots and per-block contract state.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    // Contract address -> snapshots in insertion order
    snapshots: Arc<RwLock<HashMap<String, Vec<ContractSnapshot>>>>,

    // (contract address, block number) -> state
    states: Arc<RwLock<HashMap<(String, u64), Value>>>,

    max_age: Duration,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl SnapshotCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(HashMap::new())),
            states: Arc::new(RwLock::new(HashMap::new())),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn cache_snapshot(&self, snapshot: ContractSnapshot) {
        if let Ok(mut cache) = self.snapshots.write() {
            cache
                .entry(snapshot.contract_address.clone())
                .or_default()
                .push(snapshot);
        }
    }

    /// Newest snapshot for `contract_address` younger than the default max age.
    pub fn cached_snapshot(&self, contract_address: &str) -> Option<ContractSnapshot> {
        self.cached_snapshot_within(contract_address, self.max_age)
    }

    pub fn cached_snapshot_within(
        &self,
        contract_address: &str,
        max_age: Duration,
    ) -> Option<ContractSnapshot> {
        let cache = self.snapshots.read().ok()?;
        cache
            .get(contract_address)?
            .iter()
            .filter(|s| !s.is_older_than(max_age))
            .max_by_key(|s| s.timestamp)
            .cloned()
    }

    /// Records contract state at a block, overwriting any earlier value.
    pub fn save_state(&self, contract_address: &str, block_number: u64, state: Value) {
        if let Ok(mut states) = self.states.write() {
            states.insert((contract_address.to_string(), block_number), state);
        }
    }

    pub fn state_at(&self, contract_address: &str, block_number: u64) -> Option<Value> {
        let states = self.states.read().ok()?;
        states
            .get(&(contract_address.to_string(), block_number))
            .cloned()
    }

    /// Drops snapshots older than the default max age. Contract state is kept.
    pub fn cleanup_expired(&self) {
        if let Ok(mut cache) = self.snapshots.write() {
            for snapshots in cache.values_mut() {
                snapshots.retain(|s| !s.is_older_than(self.max_age));
            }
            cache.retain(|_, snapshots| !snapshots.is_empty());
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (contracts, snapshot_entries) = self
            .snapshots
            .read()
            .map(|c| (c.len(), c.values().map(Vec::len).sum()))
            .unwrap_or((0, 0));
        let state_entries = self.states.read().map(|s| s.len()).unwrap_or(0);

        CacheStats {
            contracts,
            snapshot_entries,
            state_entries,
        }
    }

    pub fn clear_all(&self) {
        if let Ok(mut cache) = self.snapshots.write() {
            cache.clear();
        }
        if let Ok(mut states) = self.states.write() {
            states.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub contracts: usize,
    pub snapshot_entries: usize,
    pub state_entries: usize,
}
