//! Error types for the shared tier.

/// Errors raised by a [`SharedStore`](crate::SharedStore).
///
/// A missing field is not an error: lookups return `Ok(None)`. Every variant
/// here means the store could not be asked at all, or refused the command.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No connection to the store could be obtained.
    #[error("shared store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store answered with an error.
    #[error("shared store command failed: {0}")]
    Command(String),

    /// The operation did not complete in time.
    #[error("shared store operation timed out")]
    Timeout,

    /// The store was configured with invalid options.
    #[error("invalid shared store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a transport-level error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout)
    }
}

/// Errors raised by an [`UpdateChannel`](crate::UpdateChannel) or one of
/// its subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The subscription could not be established.
    #[error("failed to subscribe to '{channel}': {reason}")]
    Subscribe { channel: String, reason: String },

    /// A message could not be published.
    #[error("failed to publish to '{channel}': {reason}")]
    Publish { channel: String, reason: String },

    /// The subscription's connection was closed.
    #[error("subscription closed")]
    Closed,

    /// The subscriber fell behind and missed messages.
    #[error("subscriber lagged behind, {0} messages skipped")]
    Lagged(u64),

    /// A received message could not be read as text.
    #[error("unreadable message payload: {0}")]
    Payload(String),
}

impl ChannelError {
    /// Creates a new subscribe error.
    pub fn subscribe(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Subscribe {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new publish error.
    pub fn publish(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Publish {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the same operation might succeed on retry.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Payload(_))
    }

    /// Returns true if the subscription must be re-established.
    pub fn requires_resubscribe(&self) -> bool {
        matches!(self, Self::Subscribe { .. } | Self::Closed | Self::Lagged(_))
    }
}
