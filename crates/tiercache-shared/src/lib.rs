//! # Tiercache Shared Tier
//!
//! Cross-instance building blocks for the tiercache read-through cache.
//!
//! This crate defines the two contracts every instance relies on to stay
//! coherent with its peers, plus implementations of both:
//!
//! - [`SharedStore`]: a hash-like store holding the canonical snapshot under
//!   one namespace (field get / field set / get all fields).
//! - [`UpdateChannel`]: a broadcast publish/subscribe channel that carries
//!   cache update messages to every subscriber.
//!
//! ## Implementations
//!
//! - [`RedisStore`] / [`RedisChannel`]: Redis `HGET`/`HSET`/`HGETALL` and
//!   `PUBLISH`/`SUBSCRIBE`, pooled through `deadpool-redis`.
//! - [`MemoryStore`] / [`MemoryChannel`]: in-process versions for
//!   single-instance deployments and tests.
//!
//! ## Example
//!
//! ```ignore
//! use tiercache_shared::{RedisOptions, RedisStore, SharedStore};
//!
//! let options = RedisOptions::new("redis://localhost:6379");
//! let store = RedisStore::connect(&options)?;
//!
//! store.field_set("projects", "project:org:repo", br#"{"id":42}"#).await?;
//! let value = store.field_get("projects", "project:org:repo").await?;
//! ```

pub mod backend;
pub mod channel;
pub mod error;
pub mod memory;
pub mod store;

// Re-exports
pub use backend::{RedisChannel, RedisOptions, RedisStore};
pub use channel::{Subscription, UpdateChannel};
pub use error::{ChannelError, StoreError};
pub use memory::{MemoryChannel, MemoryStore};
pub use store::SharedStore;

// Re-export tiercache_core for consumers
pub use tiercache_core;
