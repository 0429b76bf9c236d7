//! Error types for tiercache domain values.
//!
//! Every fallible constructor in this crate returns [`Result<T>`], an alias
//! over [`CoreError`]. The server crate decides which of these become a
//! client-input error and which are only logged.
//!
//! # Example
//!
//! ```
//! use tiercache_core::{CacheKey, CoreError};
//!
//! let err = CacheKey::project("", "repo").unwrap_err();
//! assert!(err.is_client_input());
//! assert!(matches!(err, CoreError::EmptyComponent { field: "org" }));
//! ```

use thiserror::Error;

/// Main error type for tiercache domain operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One of the identifying components of a key was empty.
    #[error("key component '{field}' cannot be empty")]
    EmptyComponent {
        /// Name of the offending component
        field: &'static str,
    },

    /// A cache update message could not be decoded or encoded.
    #[error("malformed cache update: {message}")]
    MalformedUpdate {
        /// Description of the problem
        message: String,
        /// Underlying serde error, if any
        #[source]
        cause: Option<serde_json::Error>,
    },

    /// A value destined for the update channel is not valid UTF-8.
    #[error("value for key '{key}' is not valid UTF-8")]
    NonUtf8Value {
        /// Key whose value was rejected
        key: String,
    },
}

impl CoreError {
    /// Creates a malformed update error without an underlying cause.
    pub fn malformed_update(message: impl Into<String>) -> Self {
        Self::MalformedUpdate {
            message: message.into(),
            cause: None,
        }
    }

    /// Returns true if the error was caused by caller-provided input.
    pub fn is_client_input(&self) -> bool {
        matches!(self, Self::EmptyComponent { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedUpdate {
            message: err.to_string(),
            cause: Some(err),
        }
    }
}

/// Result alias for tiercache domain operations.
pub type Result<T> = std::result::Result<T, CoreError>;
