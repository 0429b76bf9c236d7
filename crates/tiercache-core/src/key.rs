//! Cache key construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Key for a single cached entry, formatted as `<namespace>:<id1>:<id2>`.
///
/// Keys are opaque once built: uniqueness only holds if every caller builds
/// them through the same constructor. Components are kept verbatim, so
/// `Rust-Lang` and `rust-lang` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Namespace tag used for repository metadata entries.
    pub const PROJECT_TAG: &'static str = "project";

    /// Builds a key from a namespace tag and two identifying components.
    ///
    /// # Examples
    ///
    /// ```
    /// use tiercache_core::CacheKey;
    ///
    /// let key = CacheKey::new("project", "octo", "hello").unwrap();
    /// assert_eq!(key.to_string(), "project:octo:hello");
    ///
    /// assert!(CacheKey::new("project", "octo", "  ").is_err());
    /// ```
    pub fn new(tag: &str, id1: &str, id2: &str) -> Result<Self> {
        if id1.trim().is_empty() {
            return Err(CoreError::EmptyComponent { field: "org" });
        }
        if id2.trim().is_empty() {
            return Err(CoreError::EmptyComponent { field: "repo" });
        }
        Ok(Self(format!("{}:{}:{}", tag, id1, id2)))
    }

    /// Builds the key for an `org/repo` project.
    pub fn project(org: &str, repo: &str) -> Result<Self> {
        Self::new(Self::PROJECT_TAG, org, repo)
    }

    /// Wraps a key received from another tier without validation.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
