//! In-process shared tier.
//!
//! Used when Redis is disabled (single-instance deployments) and by tests
//! that need a shared tier without a running server.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tiercache_core::CacheValue;
use tokio::sync::broadcast;

use crate::channel::{Subscription, UpdateChannel};
use crate::error::{ChannelError, StoreError};
use crate::store::SharedStore;

/// Shared store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, HashMap<String, CacheValue>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of fields in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Returns true if the namespace has no fields.
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn field_get(
        &self,
        namespace: &str,
        field: &str,
    ) -> Result<Option<CacheValue>, StoreError> {
        Ok(self
            .namespaces
            .read()
            .get(namespace)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    async fn field_set(
        &self,
        namespace: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        self.namespaces
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(field.to_string(), CacheValue::from(value));
        Ok(())
    }

    async fn get_all_fields(
        &self,
        namespace: &str,
    ) -> Result<HashMap<String, CacheValue>, StoreError> {
        Ok(self
            .namespaces
            .read()
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Broadcast channel kept in process memory.
///
/// Each named channel is a `tokio::sync::broadcast` channel. Publishing to a
/// channel without subscribers succeeds and the message is dropped.
#[derive(Debug)]
pub struct MemoryChannel {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl MemoryChannel {
    /// Creates a channel hub whose subscribers buffer up to 1024 messages.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Creates a channel hub with the given per-subscriber buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Returns the number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateChannel for MemoryChannel {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), ChannelError> {
        // Err only means nobody is listening
        let _ = self.sender(channel).send(message.to_string());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, ChannelError> {
        Ok(Box::new(MemorySubscription {
            receiver: self.sender(channel).subscribe(),
        }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct MemorySubscription {
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn recv(&mut self) -> Result<String, ChannelError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => ChannelError::Closed,
            broadcast::error::RecvError::Lagged(skipped) => ChannelError::Lagged(skipped),
        })
    }
}
