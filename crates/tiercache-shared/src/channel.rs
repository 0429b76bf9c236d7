//! Update channel trait definitions.

use async_trait::async_trait;

use crate::error::ChannelError;

/// A named broadcast publish/subscribe channel.
///
/// Delivery is at-least-once per connected subscriber, in arrival order per
/// subscriber. A subscriber that connects after a publish does not see it.
///
/// # Implementors
///
/// - `RedisChannel` - Redis `PUBLISH` / `SUBSCRIBE`
/// - `MemoryChannel` - In-process broadcast for single-instance mode and tests
#[async_trait]
pub trait UpdateChannel: Send + Sync {
    /// Publishes a message to every current subscriber of `channel`.
    async fn publish(&self, channel: &str, message: &str) -> Result<(), ChannelError>;

    /// Opens a subscription to `channel`.
    ///
    /// The returned handle yields messages in arrival order until the
    /// underlying connection drops.
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, ChannelError>;

    /// Returns the name of this channel implementation, for logging.
    fn name(&self) -> &str;
}

/// A live subscription returned by [`UpdateChannel::subscribe`].
#[async_trait]
pub trait Subscription: Send {
    /// Waits for the next message.
    ///
    /// # Errors
    ///
    /// - `ChannelError::Closed` if the connection dropped
    /// - `ChannelError::Lagged` if messages were lost
    /// - `ChannelError::Payload` if one message could not be read; the
    ///   subscription itself is still usable
    async fn recv(&mut self) -> Result<String, ChannelError>;
}
