pub mod rpc;
pub mod settings;

pub use rpc::{ChainOverrides, RpcSettings};
pub use settings::{AppSettings, CacheSettings, Settings};
