//! Origin fetcher: the slow, rate-limited source consulted on a full miss.

pub mod github;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use thiserror::Error;
use tiercache_core::CacheValue;

pub use github::{GithubOrigin, OriginConfig};

/// Errores del origen. Ninguno se reintenta: el read falla completo.
#[derive(Debug, Error)]
pub enum OriginError {
    /// The request did not complete within the configured timeout.
    #[error("origin request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The request could not be sent or the body could not be read.
    #[error("origin transport error: {0}")]
    Transport(String),

    /// The origin answered with something other than 200 OK.
    #[error("origin returned HTTP {status}")]
    Status { status: u16 },

    /// The body is not well-formed JSON.
    #[error("origin returned malformed payload: {0}")]
    MalformedPayload(String),

    /// The origin client could not be built from its configuration.
    #[error("invalid origin configuration: {0}")]
    InvalidConfig(String),
}

/// Source of record for cached payloads.
///
/// Implementations enforce their own timeout and never retry.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetches the payload for `org/repo`.
    async fn fetch(&self, org: &str, repo: &str) -> Result<CacheValue, OriginError>;

    /// Returns the name of this origin, for logging.
    fn name(&self) -> &str;
}

/// Checks that a payload parses as well-formed JSON without building a tree.
pub fn validate_payload(payload: &[u8]) -> Result<(), OriginError> {
    serde_json::from_slice::<IgnoredAny>(payload)
        .map(|_| ())
        .map_err(|e| OriginError::MalformedPayload(e.to_string()))
}
