//! Tiercache Core - Domain types
//!
//! This crate provides the foundational types shared by every tier of the
//! tiercache system: cache keys, opaque cache values and the update message
//! broadcast between instances.
//!
//! # Example
//!
//! ```
//! use tiercache_core::{CacheKey, CacheUpdate, CacheValue};
//!
//! let key = CacheKey::project("rust-lang", "cargo").unwrap();
//! assert_eq!(key.as_str(), "project:rust-lang:cargo");
//!
//! let update = CacheUpdate::set(key, &CacheValue::from(r#"{"id":42}"#)).unwrap();
//! let wire = update.to_json().unwrap();
//! assert!(wire.contains(r#""action":"set""#));
//! ```

pub mod error;
pub mod key;
pub mod update;
pub mod value;

pub use error::{CoreError, Result};
pub use key::CacheKey;
pub use update::{CacheAction, CacheUpdate};
pub use value::CacheValue;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
