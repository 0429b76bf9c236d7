//! Shared store trait definition.

use std::collections::HashMap;

use async_trait::async_trait;
use tiercache_core::CacheValue;

use crate::error::StoreError;

/// The canonical cross-instance snapshot.
///
/// A hash-map-like store addressed by a namespace and a field. Every
/// instance reads from and writes to the same namespace, so a field written
/// by one instance is visible to all others. Fields are only ever written,
/// never removed.
///
/// # Implementors
///
/// - `RedisStore` - Redis hash commands (`HGET`, `HSET`, `HGETALL`)
/// - `MemoryStore` - In-process map for single-instance mode and tests
///
/// # Example
///
/// ```ignore
/// use tiercache_shared::{MemoryStore, SharedStore};
///
/// let store = MemoryStore::new();
/// store.field_set("projects", "project:org:repo", br#"{"id":42}"#).await?;
///
/// let value = store.field_get("projects", "project:org:repo").await?;
/// assert!(value.is_some());
/// ```
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Reads one field.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the field does not exist. Transport failures are
    /// reported as errors and must not be confused with a miss.
    async fn field_get(&self, namespace: &str, field: &str)
    -> Result<Option<CacheValue>, StoreError>;

    /// Writes one field, replacing any previous value.
    async fn field_set(&self, namespace: &str, field: &str, value: &[u8])
    -> Result<(), StoreError>;

    /// Reads every field of the namespace.
    async fn get_all_fields(
        &self,
        namespace: &str,
    ) -> Result<HashMap<String, CacheValue>, StoreError>;

    /// Performs a health check on the store.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Returns the name of this store, for logging.
    fn name(&self) -> &str;
}
