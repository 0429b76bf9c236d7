//! Explicit invalidation of a single project entry.

use serde::Serialize;
use tiercache_core::{CacheKey, CacheUpdate};
use tracing::{error, info};

use crate::cache::coordinator::{CacheCoordinator, ReadError};

/// Resultado de una operación de invalidación.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResult {
    /// Key invalidada.
    pub invalidated: String,
}

impl CacheCoordinator {
    /// Invalida la entrada local y publica un `delete` para el resto de
    /// instancias.
    ///
    /// El shared cache no se toca: la siguiente lectura vuelve a poblar el
    /// tier local desde el snapshot compartido. El publish es best-effort,
    /// igual que en el fill.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tiercache_server::cache::CacheCoordinator;
    /// # async fn example(coordinator: CacheCoordinator) {
    /// let result = coordinator.invalidate("org", "repo").await.unwrap();
    /// println!("Invalidated {}", result.invalidated);
    /// # }
    /// ```
    pub async fn invalidate(&self, org: &str, repo: &str) -> Result<InvalidationResult, ReadError> {
        let key = CacheKey::project(org, repo)?;

        let this = self.clone();
        let task_key = key.clone();
        if let Err(e) = tokio::spawn(async move { this.evict(task_key).await }).await {
            error!(key = %key, error = %e, "Cache invalidation task failed");
        }

        info!(key = %key, "Cache entry invalidated");

        Ok(InvalidationResult {
            invalidated: key.into_string(),
        })
    }

    async fn evict(&self, key: CacheKey) {
        self.local().delete(&key).await;
        self.announce(&CacheUpdate::delete(key)).await;
    }
}
