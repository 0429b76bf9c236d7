//! Redis implementation of the shared tier.
//!
//! The snapshot lives in one Redis hash per namespace; updates travel over
//! Redis pub/sub. Commands go through a `deadpool-redis` pool, while each
//! subscription opens its own dedicated connection.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, PoolError, Runtime, Timeouts};
use futures_util::{Stream, StreamExt};
use redis::{AsyncCommands, RedisError};
use tiercache_core::CacheValue;
use tracing::{debug, info};

use crate::channel::{Subscription, UpdateChannel};
use crate::error::{ChannelError, StoreError};
use crate::store::SharedStore;

/// Connection options for Redis.
#[derive(Debug, Clone)]
pub struct RedisOptions {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: usize,
    /// Timeout applied to connection checkout and to every command.
    pub timeout: Duration,
}

impl RedisOptions {
    /// Creates options for the given URL with default pool settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the pool size.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Sets the operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates a connection pool. No connection is opened until first use.
    fn create_pool(&self) -> Result<Pool, StoreError> {
        let mut config = Config::from_url(&self.url);

        let mut pool_config = PoolConfig::new(self.pool_size);
        pool_config.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        config.pool = Some(pool_config);

        config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            timeout: Duration::from_millis(5000),
        }
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        StoreError::unavailable(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

fn map_pool_error(err: PoolError) -> StoreError {
    match err {
        PoolError::Timeout(_) => StoreError::Timeout,
        other => StoreError::unavailable(other.to_string()),
    }
}

async fn with_timeout<T, F>(timeout: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| StoreError::Timeout)?
}

/// Shared store backed by Redis hashes.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    timeout: Duration,
}

impl RedisStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Creates a store and its connection pool from options.
    pub fn connect(options: &RedisOptions) -> Result<Self, StoreError> {
        let pool = options.create_pool()?;
        info!(url = %options.url, pool_size = options.pool_size, "Redis store pool created");
        Ok(Self::new(pool, options.timeout))
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        self.pool.get().await.map_err(map_pool_error)
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn field_get(
        &self,
        namespace: &str,
        field: &str,
    ) -> Result<Option<CacheValue>, StoreError> {
        with_timeout(self.timeout, async {
            let mut conn = self.connection().await?;
            let value: Option<Vec<u8>> = conn.hget(namespace, field).await.map_err(map_redis_error)?;
            Ok(value.map(CacheValue::from))
        })
        .await
    }

    async fn field_set(
        &self,
        namespace: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            let mut conn = self.connection().await?;
            conn.hset::<_, _, _, ()>(namespace, field, value)
                .await
                .map_err(map_redis_error)?;
            debug!(namespace = %namespace, field = %field, "HSET");
            Ok(())
        })
        .await
    }

    async fn get_all_fields(
        &self,
        namespace: &str,
    ) -> Result<HashMap<String, CacheValue>, StoreError> {
        with_timeout(self.timeout, async {
            let mut conn = self.connection().await?;
            let fields: HashMap<String, Vec<u8>> =
                conn.hgetall(namespace).await.map_err(map_redis_error)?;
            Ok(fields
                .into_iter()
                .map(|(field, value)| (field, CacheValue::from(value)))
                .collect())
        })
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            let mut conn = self.connection().await?;
            let _pong: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &str {
        "redis"
    }
}

/// Update channel backed by Redis pub/sub.
#[derive(Clone)]
pub struct RedisChannel {
    client: redis::Client,
    pool: Pool,
    timeout: Duration,
}

impl RedisChannel {
    /// Creates a channel from options. Publishes use a pool; each
    /// subscription opens a dedicated connection.
    pub fn connect(options: &RedisOptions) -> Result<Self, StoreError> {
        let client = redis::Client::open(options.url.as_str())
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        let pool = options.create_pool()?;

        Ok(Self {
            client,
            pool,
            timeout: options.timeout,
        })
    }
}

#[async_trait]
impl UpdateChannel for RedisChannel {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), ChannelError> {
        let publish = async {
            let mut conn = self.pool.get().await.map_err(|e| e.to_string())?;
            conn.publish::<_, _, ()>(channel, message)
                .await
                .map_err(|e| e.to_string())
        };

        match tokio::time::timeout(self.timeout, publish).await {
            Ok(Ok(())) => {
                debug!(channel = %channel, "published cache update");
                Ok(())
            },
            Ok(Err(reason)) => Err(ChannelError::publish(channel, reason)),
            Err(_) => Err(ChannelError::publish(channel, "timed out")),
        }
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, ChannelError> {
        let connect = async {
            let mut pubsub = self
                .client
                .get_async_pubsub()
                .await
                .map_err(|e| format!("failed to get pub/sub connection: {e}"))?;
            pubsub
                .subscribe(channel)
                .await
                .map_err(|e| format!("failed to subscribe: {e}"))?;
            Ok::<_, String>(pubsub)
        };

        let pubsub = match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(pubsub)) => pubsub,
            Ok(Err(reason)) => return Err(ChannelError::subscribe(channel, reason)),
            Err(_) => return Err(ChannelError::subscribe(channel, "timed out")),
        };

        info!(channel = %channel, "Subscribed to Redis channel");

        Ok(Box::new(RedisSubscription {
            messages: Box::pin(pubsub.into_on_message()),
        }))
    }

    fn name(&self) -> &str {
        "redis"
    }
}

/// Live Redis subscription.
struct RedisSubscription {
    messages: Pin<Box<dyn Stream<Item = redis::Msg> + Send>>,
}

#[async_trait]
impl Subscription for RedisSubscription {
    async fn recv(&mut self) -> Result<String, ChannelError> {
        match self.messages.next().await {
            Some(msg) => msg
                .get_payload::<String>()
                .map_err(|e| ChannelError::Payload(e.to_string())),
            None => Err(ChannelError::Closed),
        }
    }
}
