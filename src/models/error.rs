use thiserror::Error;

/// A single failed attempt against one RPC endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ChainScopeError {
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("RPC error on {url}: {message}")]
    RpcError { url: String, message: String },

    #[error("JSON-RPC error {code}: {message}")]
    JsonRpcError { code: i64, message: String },

    #[error("All RPC endpoints failed for {chain}")]
    AllEndpointsFailed {
        chain: String,
        attempts: Vec<EndpointFailure>,
    },

    #[error("Unsupported chain type: {0}")]
    UnsupportedChainFamily(String),

    #[error("Chain not supported: {0}")]
    ChainNotSupported(String),

    #[error("Unexpected response from {chain}: {message}")]
    UnexpectedResponse { chain: String, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Alert rule error: {0}")]
    AlertRuleError(String),
}

impl ChainScopeError {
    /// Per-endpoint failures collected by an aggregated fan-out error.
    pub fn attempts(&self) -> &[EndpointFailure] {
        match self {
            ChainScopeError::AllEndpointsFailed { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainScopeError>;
