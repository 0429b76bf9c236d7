//! Update listener state tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

/// Phase of the listener's reconnect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerState {
    /// Opening a subscription.
    Connecting,
    /// Subscribed and applying updates.
    Listening,
    /// Waiting before the next subscription attempt.
    Backoff,
    /// Shut down; no more updates will be applied.
    Stopped,
}

impl ListenerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerState::Connecting => "connecting",
            ListenerState::Listening => "listening",
            ListenerState::Backoff => "backoff",
            ListenerState::Stopped => "stopped",
        }
    }
}

/// Shared view of a running listener, read by the health endpoint.
///
/// Writers that take more than one lock always take them in this order:
/// `last_error`, `failure_count`, `state`.
#[derive(Debug)]
pub struct ListenerStatus {
    /// Current phase.
    state: RwLock<ListenerState>,
    /// Consecutive subscribe/receive failures.
    failure_count: RwLock<u32>,
    /// The last error message, if any.
    last_error: RwLock<Option<String>>,
    /// When the last update was applied.
    last_update: RwLock<Option<Instant>>,
    applied: AtomicU64,
    rejected: AtomicU64,
}

impl ListenerStatus {
    /// Creates a status in the `Connecting` state.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ListenerState::Connecting),
            failure_count: RwLock::new(0),
            last_error: RwLock::new(None),
            last_update: RwLock::new(None),
            applied: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Returns the current phase.
    pub fn state(&self) -> ListenerState {
        *self.state.read()
    }

    /// Moves to a new phase.
    pub fn set_state(&self, state: ListenerState) {
        *self.state.write() = state;
    }

    /// Records a successful subscription and clears the failure streak.
    pub fn record_subscribed(&self) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();
        let mut state = self.state.write();

        *last_error = None;
        *failure_count = 0;
        *state = ListenerState::Listening;
    }

    /// Records a subscribe or receive failure.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        *last_error = Some(error.into());
        *failure_count += 1;
    }

    /// Records an applied update.
    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
        *self.last_update.write() = Some(Instant::now());
    }

    /// Records an update that could not be decoded or applied.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        *self.failure_count.read()
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns when the last update was applied.
    pub fn last_update(&self) -> Option<Instant> {
        *self.last_update.read()
    }

    /// Returns how many updates have been applied.
    pub fn applied_count(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Returns how many updates were rejected.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Returns true while subscribed.
    pub fn is_listening(&self) -> bool {
        self.state() == ListenerState::Listening
    }
}

impl Default for ListenerStatus {
    fn default() -> Self {
        Self::new()
    }
}
