//! Background synchronization of the local cache with its peers.
//!
//! - [`bootstrap`] loads the shared snapshot once at startup.
//! - [`UpdateListener`] folds update messages from other instances into the
//!   local cache for the lifetime of the process.

mod bootstrap;
mod listener;
mod status;

pub use bootstrap::{bootstrap, load_snapshot};
pub use listener::{ApplyOutcome, Backoff, ListenerConfig, ListenerHandle, UpdateListener};
pub use status::{ListenerState, ListenerStatus};
