//! Metrics module for the tiercache server.

pub mod cache;
pub mod http;
pub mod setup;

pub use cache::{CacheMetrics, CacheTier, PropagationStage};
pub use setup::init_metrics;
