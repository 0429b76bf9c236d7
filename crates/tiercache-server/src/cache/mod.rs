//! Cache module for the tiercache server.
//!
//! This module provides the per-instance local tier (Moka) and the
//! coordinator that runs the read-through cascade:
//!
//! ```text
//! read ─► local cache ─► shared cache ─► origin
//!            ▲               │             │
//!            └── self-heal ──┘             │
//!            ▲                             │
//!            └─ fill + shared write + publish
//! ```

pub mod coordinator;
pub mod invalidation;
pub mod local;

// Re-exports
pub use coordinator::{CacheCoordinator, ReadError, TierNames};
pub use invalidation::InvalidationResult;
pub use local::LocalCache;
