//! Update listener: folds cache update messages into the local cache.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tiercache_core::{CacheAction, CacheUpdate};
use tiercache_shared::{ChannelError, Subscription, UpdateChannel};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ListenerState, ListenerStatus};
use crate::cache::LocalCache;

/// Reconnect settings for the update listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the retry delay.
    pub max_backoff: Duration,
    /// Growth factor applied after each failed attempt.
    pub multiplier: f64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Exponential retry delay, capped at `max_backoff`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ListenerConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: &ListenerConfig) -> Self {
        Self {
            current: config.initial_backoff,
            config: config.clone(),
        }
    }

    /// Returns the delay to wait now and grows the next one.
    ///
    /// A product that does not fit a `Duration` (overflow or NaN) saturates
    /// at `max_backoff`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let grown =
            Duration::try_from_secs_f64(self.current.as_secs_f64() * self.config.multiplier)
                .unwrap_or(self.config.max_backoff);
        self.current = grown.min(self.config.max_backoff);
        delay
    }

    /// Goes back to the initial delay.
    pub fn reset(&mut self) {
        self.current = self.config.initial_backoff;
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}

/// Resolves once shutdown has been requested or the handle is gone.
async fn stopped(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

/// What [`UpdateListener::apply`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The entry was written to the local cache.
    Set,
    /// The entry was removed from the local cache.
    Deleted,
    /// The action is not one this instance understands.
    Ignored,
    /// The payload could not be decoded.
    Rejected,
}

/// Handle for controlling a running update listener.
pub struct ListenerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    status: Arc<ListenerStatus>,
}

impl ListenerHandle {
    /// Signals the listener to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the listener and waits for its task to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn status(&self) -> &Arc<ListenerStatus> {
        &self.status
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Long-lived subscriber on the update channel.
///
/// A failed subscription or a dropped connection never ends the task: the
/// listener waits out its backoff and subscribes again until stopped.
pub struct UpdateListener {
    channel: Arc<dyn UpdateChannel>,
    channel_name: String,
    local: LocalCache,
    config: ListenerConfig,
    status: Arc<ListenerStatus>,
}

impl UpdateListener {
    pub fn new(
        channel: Arc<dyn UpdateChannel>,
        channel_name: impl Into<String>,
        local: LocalCache,
        config: ListenerConfig,
    ) -> Self {
        Self {
            channel,
            channel_name: channel_name.into(),
            local,
            config,
            status: Arc::new(ListenerStatus::new()),
        }
    }

    /// Returns the shared status of this listener.
    pub fn status(&self) -> Arc<ListenerStatus> {
        Arc::clone(&self.status)
    }

    /// Spawns the listener loop.
    pub fn start(self) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let status = self.status();
        let task = tokio::spawn(self.run(shutdown_rx));

        ListenerHandle {
            shutdown_tx,
            task: Some(task),
            status,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(&self.config);

        info!(
            channel = %self.channel_name,
            transport = %self.channel.name(),
            "Starting update listener"
        );

        loop {
            self.status.set_state(ListenerState::Connecting);

            let subscribed = tokio::select! {
                result = self.channel.subscribe(&self.channel_name) => result,
                _ = stopped(&mut shutdown_rx) => break,
            };

            let error = match subscribed {
                Ok(mut subscription) => {
                    self.status.record_subscribed();
                    backoff.reset();
                    info!(channel = %self.channel_name, "Subscribed to cache updates");

                    tokio::select! {
                        error = self.consume(subscription.as_mut()) => error,
                        _ = stopped(&mut shutdown_rx) => break,
                    }
                },
                Err(e) => e,
            };

            self.status.record_failure(error.to_string());
            self.status.set_state(ListenerState::Backoff);
            counter!("tiercache_listener_reconnects_total").increment(1);

            let delay = backoff.next_delay();
            warn!(
                channel = %self.channel_name,
                error = %error,
                failures = self.status.failure_count(),
                retry_in = ?delay,
                "Update subscription lost, retrying"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = stopped(&mut shutdown_rx) => break,
            }
        }

        self.status.set_state(ListenerState::Stopped);
        info!(channel = %self.channel_name, "Update listener shutting down");
    }

    /// Receives until the subscription needs to be replaced.
    async fn consume(&self, subscription: &mut dyn Subscription) -> ChannelError {
        loop {
            match subscription.recv().await {
                Ok(payload) => {
                    self.apply(&payload).await;
                },
                Err(e) if e.requires_resubscribe() => return e,
                Err(e) => {
                    warn!(error = %e, "Dropped unreadable cache update");
                    self.reject();
                },
            }
        }
    }

    /// Applies one cache update message to the local cache.
    pub async fn apply(&self, payload: &str) -> ApplyOutcome {
        let update = match CacheUpdate::from_json(payload) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "Error decoding cache update");
                self.reject();
                return ApplyOutcome::Rejected;
            },
        };

        let outcome = match update.action {
            CacheAction::Set => match update.cache_value() {
                Some(value) => {
                    self.local.set(update.key.clone(), value).await;
                    ApplyOutcome::Set
                },
                None => {
                    self.reject();
                    return ApplyOutcome::Rejected;
                },
            },
            CacheAction::Delete => {
                self.local.delete(&update.key).await;
                ApplyOutcome::Deleted
            },
            CacheAction::Unknown => {
                warn!(key = %update.key, "Ignoring cache update with unknown action");
                self.reject();
                return ApplyOutcome::Ignored;
            },
        };

        debug!(key = %update.key, action = update.action.as_str(), "Applied cache update");
        counter!("tiercache_updates_applied_total", "action" => update.action.as_str())
            .increment(1);
        self.status.record_applied();

        outcome
    }

    fn reject(&self) {
        counter!("tiercache_updates_rejected_total").increment(1);
        self.status.record_rejected();
    }
}
