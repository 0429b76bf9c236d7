//! Cache update messages exchanged over the update channel.
//!
//! Wire format (JSON):
//!
//! ```text
//! {"action":"set","key":"project:org:repo","value":"{\"id\":42}"}
//! {"action":"delete","key":"project:org:repo"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::key::CacheKey;
use crate::value::CacheValue;

/// Mutation carried by a [`CacheUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    /// Store the attached value under the key.
    Set,
    /// Remove the key.
    Delete,
    /// Any action this version does not understand.
    #[serde(other)]
    Unknown,
}

impl CacheAction {
    /// Returns the wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheAction::Set => "set",
            CacheAction::Delete => "delete",
            CacheAction::Unknown => "unknown",
        }
    }
}

/// A single mutation broadcast to every instance's local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheUpdate {
    pub action: CacheAction,
    pub key: CacheKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CacheUpdate {
    /// Builds a `set` update. Fails if the value is not UTF-8, since the
    /// payload travels as a JSON string.
    pub fn set(key: CacheKey, value: &CacheValue) -> Result<Self> {
        let text = value.as_str().ok_or_else(|| CoreError::NonUtf8Value {
            key: key.to_string(),
        })?;

        Ok(Self {
            action: CacheAction::Set,
            key,
            value: Some(text.to_string()),
        })
    }

    /// Builds a `delete` update.
    pub fn delete(key: CacheKey) -> Self {
        Self {
            action: CacheAction::Delete,
            key,
            value: None,
        }
    }

    /// Decodes an update from its JSON wire form.
    ///
    /// A `set` without a value is rejected; unknown actions decode
    /// successfully so the caller can decide to ignore them.
    pub fn from_json(payload: &str) -> Result<Self> {
        let update: CacheUpdate = serde_json::from_str(payload)?;

        if update.action == CacheAction::Set && update.value.is_none() {
            return Err(CoreError::malformed_update(format!(
                "set update for '{}' carries no value",
                update.key
            )));
        }

        Ok(update)
    }

    /// Encodes the update to its JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the value as a [`CacheValue`], if present.
    pub fn cache_value(&self) -> Option<CacheValue> {
        self.value.as_deref().map(CacheValue::from)
    }
}
