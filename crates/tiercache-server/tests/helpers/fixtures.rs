//! An instance wired to in-process tiers and a mock origin.

use std::sync::Arc;
use std::time::Duration;

use tiercache_server::origin::{GithubOrigin, OriginConfig};
use tiercache_server::sync::{ListenerConfig, ListenerHandle};
use tiercache_server::{AppState, CacheCoordinator, LocalCache, assemble, create_router};
use tiercache_shared::{MemoryChannel, MemoryStore};
use wiremock::MockServer;

use super::client::TestClient;

pub const NAMESPACE: &str = "projects";
pub const CHANNEL: &str = "cache_updates";

pub struct TestApp {
    pub client: TestClient,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub channel: Arc<MemoryChannel>,
    pub origin: MockServer,
    pub listener: ListenerHandle,
}

impl TestApp {
    pub fn local(&self) -> &LocalCache {
        self.state.coordinator().local()
    }

    /// Waits until the update listener has subscribed.
    pub async fn wait_listening(&self) {
        let status = self.listener.status();
        for _ in 0..200 {
            if status.is_listening() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("listener never subscribed");
    }

    /// Waits until the listener has applied `count` updates.
    pub async fn wait_applied(&self, count: u64) {
        let status = self.listener.status();
        for _ in 0..200 {
            if status.applied_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("listener applied {} updates", status.applied_count());
    }
}

pub async fn test_app() -> TestApp {
    test_app_with_store(Arc::new(MemoryStore::new())).await
}

/// Builds an instance whose shared cache starts as `store`.
pub async fn test_app_with_store(store: Arc<MemoryStore>) -> TestApp {
    let origin = MockServer::start().await;
    let channel = Arc::new(MemoryChannel::new());

    let fetcher = GithubOrigin::new(OriginConfig {
        base_url: origin.uri(),
        timeout: Duration::from_secs(2),
        user_agent: "tiercache-test".to_string(),
        token: None,
    })
    .expect("origin client");

    let coordinator = CacheCoordinator::new(
        LocalCache::new(),
        store.clone(),
        channel.clone(),
        Arc::new(fetcher),
    );
    let instance = assemble(coordinator, ListenerConfig::default()).await;

    TestApp {
        client: TestClient::new(create_router(instance.state.clone())),
        state: instance.state,
        store,
        channel,
        origin,
        listener: instance.listener,
    }
}
