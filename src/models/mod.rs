pub mod chain;
pub mod error;
pub mod metrics;
pub mod cache;

pub use chain::*;
pub use error::*;
pub use metrics::*;
pub use cache::*;
