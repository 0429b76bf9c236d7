use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use tiercache_shared::{
    MemoryChannel, MemoryStore, RedisChannel, RedisStore, SharedStore, UpdateChannel,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::{CacheCoordinator, LocalCache};
use crate::handlers::{
    health::health_check,
    metrics::metrics_handler,
    project::{get_project, invalidate_project},
};
use crate::metrics::CacheMetrics;
use crate::middleware::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::origin::GithubOrigin;
use crate::settings::{RedisSettings, Settings};
use crate::state::AppState;
use crate::sync::{ListenerConfig, ListenerHandle, UpdateListener, bootstrap};

fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Wildcard so empty org/repo segments reach the handler
        .route(
            "/project/{*path}",
            get(get_project).delete(invalidate_project),
        )
        .with_state(state)
}

fn with_middleware(router: Router) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(set_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(propagate_request_id_layer());

    router
        .layer(middleware::from_fn(
            crate::metrics::http::http_metrics_middleware,
        ))
        .layer(middleware_stack)
}

/// Creates the application router without the `/metrics` endpoint.
pub fn create_router(state: AppState) -> Router {
    with_middleware(app_routes(state))
}

/// Creates the application router including `/metrics`.
pub fn create_router_with_metrics(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Router for metrics endpoint (different state)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    with_middleware(Router::new().merge(app_routes(state)).merge(metrics_router))
}

/// A wired instance: state for the HTTP layer plus its background listener.
pub struct Instance {
    pub state: AppState,
    pub listener: ListenerHandle,
}

/// Bootstraps the local cache and starts the update listener.
///
/// Bootstrap failures are logged and the instance starts with an empty local
/// cache. The listener task is spawned before the caller starts serving.
pub async fn assemble(coordinator: CacheCoordinator, listener_config: ListenerConfig) -> Instance {
    let names = coordinator.names().clone();

    bootstrap(
        coordinator.store().as_ref(),
        &names.namespace,
        coordinator.local(),
    )
    .await;

    let listener = UpdateListener::new(
        Arc::clone(coordinator.channel()),
        names.channel,
        coordinator.local().clone(),
        listener_config,
    );
    let status = listener.status();
    let handle = listener.start();

    Instance {
        state: AppState::new(coordinator, status),
        listener: handle,
    }
}

/// Builds the shared tiers: Redis when enabled, in-process otherwise.
pub fn connect_tiers(
    redis: &RedisSettings,
) -> anyhow::Result<(Arc<dyn SharedStore>, Arc<dyn UpdateChannel>)> {
    if !redis.enabled {
        info!("Redis disabled, running single-instance with in-process tiers");
        return Ok((Arc::new(MemoryStore::new()), Arc::new(MemoryChannel::new())));
    }

    let options = redis.options();
    let store = RedisStore::connect(&options).context("failed to create Redis store")?;
    let channel = RedisChannel::connect(&options).context("failed to create Redis channel")?;
    info!(url = %redis.url, namespace = %redis.namespace, channel = %redis.channel, "Using Redis tiers");

    Ok((Arc::new(store), Arc::new(channel)))
}

/// Wires every tier from settings and starts the background tasks.
pub async fn start_instance(settings: &Settings) -> anyhow::Result<Instance> {
    let (store, channel) = connect_tiers(&settings.redis)?;
    let origin = GithubOrigin::new(settings.origin.to_config())
        .context("failed to create origin client")?;
    let local = LocalCache::with_metrics(CacheMetrics::new());

    let coordinator = CacheCoordinator::new(local, store, channel, Arc::new(origin))
        .with_names(settings.redis.tier_names());

    Ok(assemble(coordinator, settings.listener.to_config()).await)
}

/// Runs the server with the given state and metrics handle.
pub async fn run_server_with_state(
    addr: SocketAddr,
    state: AppState,
    prometheus_handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = create_router_with_metrics(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
