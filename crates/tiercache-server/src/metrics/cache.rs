//! Cache metrics recording.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registra las metricas de cache.
/// Llamar una vez al inicio para registrar las metricas.
pub fn register_cache_metrics() {
    metrics::describe_counter!("tiercache_cache_hits_total", "Cache hits by tier");
    metrics::describe_counter!(
        "tiercache_cache_misses_total",
        "Reads that missed every cache tier"
    );
    metrics::describe_counter!(
        "tiercache_origin_fetches_total",
        "Origin fetches by outcome"
    );
    metrics::describe_counter!(
        "tiercache_propagation_failures_total",
        "Best-effort writes that failed after a successful origin fetch"
    );
    metrics::describe_counter!(
        "tiercache_shared_read_errors_total",
        "Shared cache reads that failed and were treated as a miss"
    );
    metrics::describe_counter!(
        "tiercache_updates_applied_total",
        "Cache update messages applied to the local cache"
    );
    metrics::describe_counter!(
        "tiercache_updates_rejected_total",
        "Cache update messages that could not be decoded or applied"
    );
    metrics::describe_counter!(
        "tiercache_listener_reconnects_total",
        "Update listener subscription failures followed by a retry"
    );
    metrics::describe_gauge!("tiercache_local_entries", "Entries in the local cache");
    metrics::describe_gauge!(
        "tiercache_bootstrap_entries",
        "Entries loaded by the last bootstrap"
    );
    metrics::describe_histogram!(
        "tiercache_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Tier that answered a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Local,
    Shared,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Local => "local",
            CacheTier::Shared => "shared",
        }
    }
}

/// Best-effort write that can fail without failing the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationStage {
    /// Writing (or deleting) the shared cache field.
    SharedWrite,
    /// Publishing the update message.
    Publish,
    /// Encoding the update message.
    Encode,
}

impl PropagationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationStage::SharedWrite => "shared_write",
            PropagationStage::Publish => "publish",
            PropagationStage::Encode => "encode",
        }
    }
}

/// Recorder de metricas del coordinador.
/// Cada evento se emite al recorder global y se refleja en contadores
/// atomicos locales, para poder inspeccionarlos sin exporter.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    local_hits: AtomicU64,
    shared_hits: AtomicU64,
    misses: AtomicU64,
    origin_fetches: AtomicU64,
    origin_failures: AtomicU64,
    propagation_failures: AtomicU64,
    shared_read_errors: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un hit en el tier dado
    pub fn record_hit(&self, tier: CacheTier) {
        let counter = match tier {
            CacheTier::Local => &self.inner.local_hits,
            CacheTier::Shared => &self.inner.shared_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        counter!("tiercache_cache_hits_total", "tier" => tier.as_str()).increment(1);
    }

    /// Registra un miss en ambos tiers
    pub fn record_miss(&self) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        counter!("tiercache_cache_misses_total").increment(1);
    }

    /// Registra el resultado de un fetch al origen
    pub fn record_origin_fetch(&self, success: bool) {
        self.inner.origin_fetches.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.inner.origin_failures.fetch_add(1, Ordering::Relaxed);
        }
        let outcome = if success { "ok" } else { "error" };
        counter!("tiercache_origin_fetches_total", "outcome" => outcome).increment(1);
    }

    /// Registra una escritura best-effort fallida
    pub fn record_propagation_failure(&self, stage: PropagationStage) {
        self.inner.propagation_failures.fetch_add(1, Ordering::Relaxed);
        counter!("tiercache_propagation_failures_total", "stage" => stage.as_str()).increment(1);
    }

    /// Registra un error de transporte leyendo el shared cache
    pub fn record_shared_read_error(&self) {
        self.inner.shared_read_errors.fetch_add(1, Ordering::Relaxed);
        counter!("tiercache_shared_read_errors_total").increment(1);
    }

    /// Actualiza el gauge de entries
    pub fn update_entry_count(&self, count: u64) {
        gauge!("tiercache_local_entries").set(count as f64);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!("tiercache_cache_operation_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Fraccion de lecturas servidas por algun tier de cache
    pub fn hit_rate(&self) -> f64 {
        let hits = (self.local_hits() + self.shared_hits()) as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn local_hits(&self) -> u64 {
        self.inner.local_hits.load(Ordering::Relaxed)
    }

    pub fn shared_hits(&self) -> u64 {
        self.inner.shared_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.inner.misses.load(Ordering::Relaxed)
    }

    pub fn origin_fetches(&self) -> u64 {
        self.inner.origin_fetches.load(Ordering::Relaxed)
    }

    pub fn origin_failures(&self) -> u64 {
        self.inner.origin_failures.load(Ordering::Relaxed)
    }

    pub fn propagation_failures(&self) -> u64 {
        self.inner.propagation_failures.load(Ordering::Relaxed)
    }

    pub fn shared_read_errors(&self) -> u64 {
        self.inner.shared_read_errors.load(Ordering::Relaxed)
    }
}
