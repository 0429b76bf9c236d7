//! One-time load of the shared snapshot into the local cache.

use std::time::Instant;

use metrics::gauge;
use tiercache_core::CacheKey;
use tiercache_shared::{SharedStore, StoreError};
use tracing::{debug, info, warn};

use crate::cache::LocalCache;

/// Copies every field of `namespace` into the local cache.
///
/// Returns the number of entries loaded.
pub async fn load_snapshot(
    store: &dyn SharedStore,
    namespace: &str,
    local: &LocalCache,
) -> Result<usize, StoreError> {
    let start = Instant::now();
    let snapshot = store.get_all_fields(namespace).await?;
    let mut count = 0;

    for (field, value) in snapshot {
        if value.is_empty() {
            debug!(key = %field, "Skipping empty shared field");
            continue;
        }
        debug!(key = %field, "Bootstrapped cache key");
        local.set(CacheKey::from_raw(field), value).await;
        count += 1;
    }

    local
        .metrics()
        .record_operation_duration("bootstrap", start.elapsed());
    gauge!("tiercache_bootstrap_entries").set(count as f64);

    Ok(count)
}

/// Runs [`load_snapshot`], logging instead of failing.
///
/// An instance that cannot bootstrap starts with an empty local cache and
/// fills it through the read cascade.
pub async fn bootstrap(store: &dyn SharedStore, namespace: &str, local: &LocalCache) -> usize {
    match load_snapshot(store, namespace, local).await {
        Ok(count) => {
            info!(
                store = %store.name(),
                namespace = %namespace,
                entries = count,
                "Local cache bootstrapped from shared cache"
            );
            count
        },
        Err(e) => {
            warn!(
                store = %store.name(),
                namespace = %namespace,
                error = %e,
                "Error bootstrapping local cache, starting empty"
            );
            0
        },
    }
}
