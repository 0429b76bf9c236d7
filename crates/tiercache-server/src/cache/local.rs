//! Per-instance local cache using Moka.

use std::time::Instant;

use moka::future::Cache;
use tiercache_core::{CacheKey, CacheValue};

use crate::metrics::CacheMetrics;

/// Cache local en memoria de la instancia.
/// Thread-safe y async-friendly; las entries no expiran ni se desalojan,
/// solo se eliminan con `delete`.
///
/// # Examples
///
/// ```no_run
/// use tiercache_core::{CacheKey, CacheValue};
/// use tiercache_server::cache::LocalCache;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = LocalCache::new();
/// let key = CacheKey::project("org", "repo").unwrap();
///
/// cache.set(key.clone(), CacheValue::from(r#"{"id":42}"#)).await;
/// if let Some(value) = cache.get(&key).await {
///     println!("Cache hit: {} bytes", value.len());
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct LocalCache {
    inner: Cache<CacheKey, CacheValue>,
    metrics: CacheMetrics,
}

impl LocalCache {
    /// Crea un cache vacio y sin limite de capacidad.
    pub fn new() -> Self {
        Self::with_metrics(CacheMetrics::new())
    }

    /// Crea un cache que reporta a las metricas dadas.
    pub fn with_metrics(metrics: CacheMetrics) -> Self {
        Self {
            inner: Cache::builder().build(),
            metrics,
        }
    }

    /// Obtiene un valor del cache si existe.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        self.metrics
            .record_operation_duration("local_get", start.elapsed());
        result
    }

    /// Inserta o reemplaza un valor. La ultima escritura gana.
    pub async fn set(&self, key: CacheKey, value: CacheValue) {
        let start = Instant::now();
        self.inner.insert(key, value).await;
        self.metrics
            .record_operation_duration("local_set", start.elapsed());
        self.update_entry_gauge();
    }

    /// Elimina una entrada. No hace nada si no existe.
    pub async fn delete(&self, key: &CacheKey) {
        self.inner.invalidate(key).await;
        self.update_entry_gauge();
    }

    /// Retorna true si la key esta presente.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains_key(key)
    }

    /// Retorna el numero aproximado de entries en cache.
    /// Llamar a `run_pending_tasks` antes para un valor exacto.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Itera sobre todas las entries del cache.
    /// Nota: Esta es una snapshot, entries pueden cambiar durante iteracion.
    pub fn iter(&self) -> impl Iterator<Item = (std::sync::Arc<CacheKey>, CacheValue)> + '_ {
        self.inner.iter()
    }

    /// Aplica el mantenimiento pendiente de Moka (conteo de entries).
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
        self.update_entry_gauge();
    }

    /// Retorna las metricas para acceso externo.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    fn update_entry_gauge(&self) {
        self.metrics.update_entry_count(self.inner.entry_count());
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}
