//! # Tiercache Server
//!
//! HTTP front end for the tiered project metadata cache. Every instance keeps
//! a local in-memory tier, shares a Redis hash with its peers and learns
//! about peer writes through a pub/sub channel; full misses go to the origin.

pub mod cache;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod origin;
pub mod server;
pub mod settings;
pub mod state;
pub mod sync;

pub use cache::{CacheCoordinator, LocalCache, ReadError, TierNames};
pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use server::{
    Instance, assemble, connect_tiers, create_router, create_router_with_metrics,
    run_server_with_state, start_instance,
};
pub use settings::Settings;
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
