//! Read-through / write-through cascade across the cache tiers.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tiercache_core::{CacheKey, CacheUpdate, CacheValue, CoreError};
use tiercache_shared::{SharedStore, UpdateChannel};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::local::LocalCache;
use crate::metrics::{CacheMetrics, CacheTier, PropagationStage};
use crate::origin::{OriginError, OriginFetcher, validate_payload};

/// Error de una lectura. Solo estas dos formas llegan al cliente.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The caller supplied an unusable identifier.
    #[error(transparent)]
    InvalidInput(#[from] CoreError),

    /// Both tiers missed and the origin failed.
    #[error(transparent)]
    Origin(#[from] OriginError),
}

/// Names of the shared hash and the update channel.
#[derive(Debug, Clone)]
pub struct TierNames {
    /// Hash holding the canonical snapshot.
    pub namespace: String,
    /// Broadcast channel carrying cache update messages.
    pub channel: String,
}

impl Default for TierNames {
    fn default() -> Self {
        Self {
            namespace: "projects".to_string(),
            channel: "cache_updates".to_string(),
        }
    }
}

/// Orchestrates local cache, shared cache and origin.
///
/// Cloning is cheap; every clone drives the same tiers. There is no
/// per-key coordination: concurrent misses on one key each reach the origin
/// and each write back.
#[derive(Clone)]
pub struct CacheCoordinator {
    local: LocalCache,
    store: Arc<dyn SharedStore>,
    channel: Arc<dyn UpdateChannel>,
    origin: Arc<dyn OriginFetcher>,
    names: Arc<TierNames>,
    metrics: CacheMetrics,
}

impl CacheCoordinator {
    /// Creates a coordinator with the default tier names.
    pub fn new(
        local: LocalCache,
        store: Arc<dyn SharedStore>,
        channel: Arc<dyn UpdateChannel>,
        origin: Arc<dyn OriginFetcher>,
    ) -> Self {
        let metrics = local.metrics().clone();
        Self {
            local,
            store,
            channel,
            origin,
            names: Arc::new(TierNames::default()),
            metrics,
        }
    }

    /// Overrides the shared namespace and channel names.
    pub fn with_names(mut self, names: TierNames) -> Self {
        self.names = Arc::new(names);
        self
    }

    /// Reads `org/repo` through the cascade.
    ///
    /// 1. Local cache hit returns immediately.
    /// 2. Shared cache hit is copied into the local cache, then returned.
    ///    A shared cache transport error is logged and treated as a miss.
    /// 3. On a full miss the origin is fetched; a failure fails the read.
    /// 4. The fetched payload is written to the shared cache, the local
    ///    cache and announced on the update channel. Only the local write is
    ///    guaranteed; the other two are best-effort.
    #[instrument(skip(self), fields(key = tracing::field::Empty))]
    pub async fn read(&self, org: &str, repo: &str) -> Result<CacheValue, ReadError> {
        let start = Instant::now();
        let key = CacheKey::project(org, repo)?;
        tracing::Span::current().record("key", key.as_str());

        if let Some(value) = self.local.get(&key).await {
            debug!("cache hit (local)");
            self.metrics.record_hit(CacheTier::Local);
            self.metrics
                .record_operation_duration("read_local_hit", start.elapsed());
            return Ok(value);
        }

        if let Some(value) = self.lookup_shared(&key).await {
            debug!("cache hit (shared)");
            self.metrics.record_hit(CacheTier::Shared);
            self.local.set(key, value.clone()).await;
            self.metrics
                .record_operation_duration("read_shared_hit", start.elapsed());
            return Ok(value);
        }

        self.metrics.record_miss();

        let value = match self.fetch_origin(org, repo).await {
            Ok(value) => value,
            Err(e) => {
                warn!(origin = %self.origin.name(), error = %e, "Origin fetch failed");
                self.metrics.record_origin_fetch(false);
                return Err(e.into());
            },
        };
        self.metrics.record_origin_fetch(true);

        // Propagation runs on its own task so it completes even if the
        // caller goes away mid-request
        let this = self.clone();
        let fill_key = key.clone();
        let fill_value = value.clone();
        let fill = tokio::spawn(async move { this.fill(fill_key, fill_value).await });
        if let Err(e) = fill.await {
            error!(key = %key, error = %e, "Cache fill task failed");
        }

        self.metrics
            .record_operation_duration("read_origin", start.elapsed());
        info!(bytes = value.len(), "Cached payload fetched from origin");

        Ok(value)
    }

    async fn lookup_shared(&self, key: &CacheKey) -> Option<CacheValue> {
        match self
            .store
            .field_get(&self.names.namespace, key.as_str())
            .await
        {
            // An empty field holds no payload
            Ok(Some(value)) if value.is_empty() => {
                debug!(key = %key, "Empty shared field, treating as miss");
                None
            },
            Ok(value) => value,
            Err(e) => {
                warn!(
                    store = %self.store.name(),
                    key = %key,
                    error = %e,
                    "Shared cache read failed, treating as miss"
                );
                self.metrics.record_shared_read_error();
                None
            },
        }
    }

    async fn fetch_origin(&self, org: &str, repo: &str) -> Result<CacheValue, OriginError> {
        let value = self.origin.fetch(org, repo).await?;
        validate_payload(value.as_bytes())?;
        Ok(value)
    }

    /// Writes a fresh value to every tier and announces it to peers.
    async fn fill(&self, key: CacheKey, value: CacheValue) {
        if let Err(e) = self
            .store
            .field_set(&self.names.namespace, key.as_str(), value.as_bytes())
            .await
        {
            error!(key = %key, error = %e, "Error saving entry to shared cache");
            self.metrics
                .record_propagation_failure(PropagationStage::SharedWrite);
        }

        self.local.set(key.clone(), value.clone()).await;

        match CacheUpdate::set(key.clone(), &value) {
            Ok(update) => self.announce(&update).await,
            Err(e) => {
                error!(key = %key, error = %e, "Error encoding cache update");
                self.metrics
                    .record_propagation_failure(PropagationStage::Encode);
            },
        }
    }

    /// Publishes an update on the channel. Failures are logged and counted.
    pub(crate) async fn announce(&self, update: &CacheUpdate) {
        let message = match update.to_json() {
            Ok(message) => message,
            Err(e) => {
                error!(key = %update.key, error = %e, "Error encoding cache update");
                self.metrics
                    .record_propagation_failure(PropagationStage::Encode);
                return;
            },
        };

        if let Err(e) = self.channel.publish(&self.names.channel, &message).await {
            error!(
                key = %update.key,
                action = update.action.as_str(),
                error = %e,
                "Error publishing cache update"
            );
            self.metrics
                .record_propagation_failure(PropagationStage::Publish);
        }
    }

    /// Returns the local tier.
    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Returns the shared tier.
    pub fn store(&self) -> &Arc<dyn SharedStore> {
        &self.store
    }

    /// Returns the update channel.
    pub fn channel(&self) -> &Arc<dyn UpdateChannel> {
        &self.channel
    }

    /// Returns the tier names in use.
    pub fn names(&self) -> &TierNames {
        &self.names
    }

    /// Returns the metrics for external access.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tiercache_core::CacheAction;
    use tiercache_shared::{
        ChannelError, MemoryChannel, MemoryStore, StoreError, Subscription,
    };

    /// Origin double que cuenta llamadas y responde con un resultado fijo.
    pub(crate) struct StubOrigin {
        pub calls: AtomicU32,
        response: Mutex<Result<&'static str, u16>>,
    }

    impl StubOrigin {
        pub fn ok(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                response: Mutex::new(Ok(body)),
            })
        }

        pub fn status(status: u16) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                response: Mutex::new(Err(status)),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OriginFetcher for StubOrigin {
        async fn fetch(&self, _org: &str, _repo: &str) -> Result<CacheValue, OriginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match *self.response.lock() {
                Ok(body) => Ok(CacheValue::from(body)),
                Err(status) => Err(OriginError::Status { status }),
            }
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Shared tier that is unreachable.
    struct DownStore;

    #[async_trait]
    impl SharedStore for DownStore {
        async fn field_get(&self, _: &str, _: &str) -> Result<Option<CacheValue>, StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn field_set(&self, _: &str, _: &str, _: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn get_all_fields(
            &self,
            _: &str,
        ) -> Result<HashMap<String, CacheValue>, StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    /// Channel that refuses every publish.
    struct DownChannel;

    #[async_trait]
    impl UpdateChannel for DownChannel {
        async fn publish(&self, channel: &str, _: &str) -> Result<(), ChannelError> {
            Err(ChannelError::publish(channel, "broken pipe"))
        }

        async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, ChannelError> {
            Err(ChannelError::subscribe(channel, "broken pipe"))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    pub(crate) struct Fixture {
        pub coordinator: CacheCoordinator,
        pub store: Arc<MemoryStore>,
        pub channel: Arc<MemoryChannel>,
        pub origin: Arc<StubOrigin>,
    }

    pub(crate) fn fixture(origin: Arc<StubOrigin>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(MemoryChannel::new());
        let coordinator = CacheCoordinator::new(
            LocalCache::new(),
            store.clone(),
            channel.clone(),
            origin.clone(),
        );
        Fixture {
            coordinator,
            store,
            channel,
            origin,
        }
    }

    fn key() -> CacheKey {
        CacheKey::project("org", "repo").unwrap()
    }

    #[tokio::test]
    async fn test_full_miss_fills_every_tier() {
        let f = fixture(StubOrigin::ok(r#"{"id":42}"#));
        let mut sub = f.channel.subscribe("cache_updates").await.unwrap();

        let value = f.coordinator.read("org", "repo").await.unwrap();

        assert_eq!(value.as_bytes(), br#"{"id":42}"#);
        assert_eq!(f.origin.calls(), 1);

        let shared = f.store.field_get("projects", "project:org:repo").await.unwrap();
        assert_eq!(shared, Some(value.clone()));
        assert_eq!(f.coordinator.local().get(&key()).await, Some(value.clone()));

        let update = CacheUpdate::from_json(&sub.recv().await.unwrap()).unwrap();
        assert_eq!(update.action, CacheAction::Set);
        assert_eq!(update.key, key());
        assert_eq!(update.cache_value(), Some(value));
    }

    #[tokio::test]
    async fn test_repeated_reads_do_not_refetch() {
        let f = fixture(StubOrigin::ok(r#"{"id":42}"#));

        let first = f.coordinator.read("org", "repo").await.unwrap();
        for _ in 0..5 {
            let again = f.coordinator.read("org", "repo").await.unwrap();
            assert_eq!(again.as_bytes(), first.as_bytes());
        }

        assert_eq!(f.origin.calls(), 1);
        assert_eq!(f.coordinator.metrics().local_hits(), 5);
    }

    #[tokio::test]
    async fn test_shared_hit_self_heals_local() {
        let f = fixture(StubOrigin::ok("{}"));
        f.store
            .field_set("projects", "project:org:repo", br#"{"id":42}"#)
            .await
            .unwrap();

        let value = f.coordinator.read("org", "repo").await.unwrap();

        assert_eq!(value.as_bytes(), br#"{"id":42}"#);
        assert_eq!(f.origin.calls(), 0);
        assert_eq!(f.coordinator.local().get(&key()).await, Some(value));
        assert_eq!(f.coordinator.metrics().shared_hits(), 1);
    }

    #[tokio::test]
    async fn test_empty_shared_field_is_a_miss() {
        let f = fixture(StubOrigin::ok(r#"{"id":42}"#));
        f.store
            .field_set("projects", "project:org:repo", b"")
            .await
            .unwrap();

        let value = f.coordinator.read("org", "repo").await.unwrap();

        assert_eq!(value.as_bytes(), br#"{"id":42}"#);
        assert_eq!(f.origin.calls(), 1);
        assert_eq!(f.coordinator.metrics().shared_hits(), 0);
        assert_eq!(
            f.store.field_get("projects", "project:org:repo").await.unwrap(),
            Some(value)
        );
    }

    #[tokio::test]
    async fn test_origin_failure_writes_nothing() {
        let f = fixture(StubOrigin::status(503));
        let mut sub = f.channel.subscribe("cache_updates").await.unwrap();

        let err = f.coordinator.read("org", "repo").await.unwrap_err();

        assert!(matches!(err, ReadError::Origin(OriginError::Status { status: 503 })));
        assert!(f.store.is_empty("projects"));
        assert!(f.coordinator.local().get(&key()).await.is_none());
        assert!(
            tokio::time::timeout(Duration::from_millis(50), sub.recv())
                .await
                .is_err(),
            "nothing should be published"
        );
        assert_eq!(f.coordinator.metrics().origin_failures(), 1);
    }

    #[tokio::test]
    async fn test_malformed_origin_payload_fails_read() {
        let f = fixture(StubOrigin::ok("definitely not json"));

        let err = f.coordinator.read("org", "repo").await.unwrap_err();

        assert!(matches!(err, ReadError::Origin(OriginError::MalformedPayload(_))));
        assert!(f.store.is_empty("projects"));
    }

    #[tokio::test]
    async fn test_empty_component_is_client_error_without_io() {
        let f = fixture(StubOrigin::ok("{}"));

        for (org, repo) in [("", "repo"), ("org", ""), (" ", "repo")] {
            let err = f.coordinator.read(org, repo).await.unwrap_err();
            assert!(matches!(err, ReadError::InvalidInput(_)));
        }

        assert_eq!(f.origin.calls(), 0);
        assert_eq!(f.coordinator.metrics().misses(), 0);
    }

    #[tokio::test]
    async fn test_shared_outage_falls_through_to_origin() {
        let origin = StubOrigin::ok(r#"{"id":7}"#);
        let coordinator = CacheCoordinator::new(
            LocalCache::new(),
            Arc::new(DownStore),
            Arc::new(MemoryChannel::new()),
            origin.clone(),
        );

        let value = coordinator.read("org", "repo").await.unwrap();

        assert_eq!(value.as_bytes(), br#"{"id":7}"#);
        assert_eq!(origin.calls(), 1);
        // Local still filled, failures observable
        assert!(coordinator.local().get(&key()).await.is_some());
        assert_eq!(coordinator.metrics().shared_read_errors(), 1);
        assert_eq!(coordinator.metrics().propagation_failures(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_read() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = CacheCoordinator::new(
            LocalCache::new(),
            store.clone(),
            Arc::new(DownChannel),
            StubOrigin::ok(r#"{"id":1}"#),
        );

        assert!(coordinator.read("org", "repo").await.is_ok());
        assert_eq!(store.len("projects"), 1);
        assert_eq!(coordinator.metrics().propagation_failures(), 1);
    }

    #[tokio::test]
    async fn test_custom_tier_names() {
        let f = fixture(StubOrigin::ok("{}"));
        let coordinator = f.coordinator.clone().with_names(TierNames {
            namespace: "repos".to_string(),
            channel: "repo_updates".to_string(),
        });
        let mut sub = f.channel.subscribe("repo_updates").await.unwrap();

        coordinator.read("org", "repo").await.unwrap();

        assert_eq!(f.store.len("repos"), 1);
        assert!(f.store.is_empty("projects"));
        assert!(sub.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_misses_are_not_deduplicated() {
        let origin = StubOrigin::ok(r#"{"id":42}"#);
        let f = fixture(origin.clone());

        let (a, b) = tokio::join!(
            f.coordinator.read("org", "repo"),
            f.coordinator.read("org", "repo")
        );
        assert_eq!(a.unwrap(), b.unwrap());

        // Both may reach the origin; at least one did, never more than two
        let calls = origin.calls();
        assert!((1..=2).contains(&calls));
    }
}
