pub mod client;
pub mod fanout;
pub mod method;
pub mod resilience;

pub use client::{HttpTransport, RpcRequest, RpcResponse, RpcTransport};
pub use fanout::{parse_block_number, FanoutClient};
pub use method::{translate_method, LogicalMethod};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, EndpointHealth, RetryConfig,
};
