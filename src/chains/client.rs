use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::{ChainScopeError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A decoded JSON-RPC response body. Both members are optional because
/// public endpoints are loose about which one they include.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn success(result: Value) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn failure(code: i64, message: &str) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            error: Some(serde_json::json!({ "code": code, "message": message })),
            ..Default::default()
        }
    }

    /// Splits the body into its result, or the JSON-RPC error it carries.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                Err(ChainScopeError::JsonRpcError { code, message })
            }
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Sends one JSON-RPC envelope to one endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, url: &str, request: &RpcRequest) -> Result<RpcResponse>;
}

/// HTTP transport backed by a shared reqwest client.
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, url: &str, request: &RpcRequest) -> Result<RpcResponse> {
        debug!("POST {} method={} id={}", url, request.method, request.id);

        let response = self
            .http_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChainScopeError::RpcError {
                url: url.to_string(),
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainScopeError::RpcError {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response
            .json::<RpcResponse>()
            .await
            .map_err(|e| ChainScopeError::RpcError {
                url: url.to_string(),
                message: format!("Failed to parse response: {}", e),
            })
    }
}
