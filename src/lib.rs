pub mod models;
pub mod config;
pub mod chains;
pub mod verification;
pub mod alerts;
pub mod analysis;

pub use models::{ChainConfig, ChainFamily, ChainRegistry, ChainScopeError, Result};
pub use config::{RpcSettings, Settings};
pub use chains::FanoutClient;

// Re-export commonly used types
pub use serde_json::Value;
