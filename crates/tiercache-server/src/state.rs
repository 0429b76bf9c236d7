//! Application state.

use std::sync::Arc;

use crate::cache::CacheCoordinator;
use crate::sync::ListenerStatus;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The read-through cascade.
    coordinator: CacheCoordinator,
    /// Status of this instance's update listener.
    listener: Arc<ListenerStatus>,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(coordinator: CacheCoordinator, listener: Arc<ListenerStatus>) -> Self {
        Self {
            coordinator,
            listener,
        }
    }

    /// Returns the cache coordinator.
    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    /// Returns the update listener status.
    pub fn listener(&self) -> &ListenerStatus {
        self.listener.as_ref()
    }
}
