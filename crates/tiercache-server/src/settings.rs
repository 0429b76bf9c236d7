//! Instance configuration.
//!
//! Loaded from an optional `tiercache.toml` plus environment overrides such
//! as `TIERCACHE__SERVER__PORT=9090` or `TIERCACHE__REDIS__ENABLED=false`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tiercache_shared::RedisOptions;

use crate::cache::TierNames;
use crate::origin::OriginConfig;
use crate::sync::ListenerConfig;

const DEFAULT_CONFIG_FILE: &str = "tiercache.toml";
const ENV_PREFIX: &str = "TIERCACHE";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl SettingsError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub origin: OriginSettings,
    #[serde(default)]
    pub listener: ListenerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Shared cache and update channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// When false the instance runs alone with in-process tiers.
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Hash holding the shared entries.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Pub/sub channel for cache update messages.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            namespace: default_namespace(),
            channel: default_channel(),
            pool_size: default_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_namespace() -> String {
    "projects".to_string()
}

fn default_channel() -> String {
    "cache_updates".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl RedisSettings {
    pub fn options(&self) -> RedisOptions {
        RedisOptions::new(&self.url)
            .pool_size(self.pool_size)
            .timeout(Duration::from_millis(self.timeout_ms))
    }

    pub fn tier_names(&self) -> TierNames {
        TierNames {
            namespace: self.namespace.clone(),
            channel: self.channel.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OriginSettings {
    #[serde(default = "default_origin_url")]
    pub base_url: String,
    #[serde(default = "default_origin_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Prefer `TIERCACHE__ORIGIN__TOKEN` over the config file.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for OriginSettings {
    fn default() -> Self {
        Self {
            base_url: default_origin_url(),
            timeout_secs: default_origin_timeout_secs(),
            user_agent: default_user_agent(),
            token: None,
        }
    }
}

fn default_origin_url() -> String {
    "https://api.github.com".to_string()
}

fn default_origin_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("tiercache/{}", env!("CARGO_PKG_VERSION"))
}

impl OriginSettings {
    pub fn to_config(&self) -> OriginConfig {
        OriginConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            token: self.token.clone().filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerSettings {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

/// Largest accepted backoff growth factor.
const MAX_MULTIPLIER: f64 = 10.0;

fn default_multiplier() -> f64 {
    2.0
}

impl ListenerSettings {
    pub fn to_config(&self) -> ListenerConfig {
        ListenerConfig {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or `tiercache.toml` if present) and the
    /// environment.
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(builder)
    }

    /// Builds and validates settings from an already assembled source list.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings the instance cannot start with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.socket_addr()?;

        let origin = Url::parse(&self.origin.base_url)
            .map_err(|e| SettingsError::invalid("origin.base_url", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(SettingsError::invalid(
                "origin.base_url",
                format!("unsupported scheme '{}'", origin.scheme()),
            ));
        }
        if self.origin.timeout_secs == 0 {
            return Err(SettingsError::invalid("origin.timeout_secs", "must be > 0"));
        }

        if self.redis.enabled {
            let redis = Url::parse(&self.redis.url)
                .map_err(|e| SettingsError::invalid("redis.url", e.to_string()))?;
            if !matches!(redis.scheme(), "redis" | "rediss" | "unix" | "redis+unix") {
                return Err(SettingsError::invalid(
                    "redis.url",
                    format!("unsupported scheme '{}'", redis.scheme()),
                ));
            }
        }
        if self.redis.namespace.is_empty() {
            return Err(SettingsError::invalid("redis.namespace", "cannot be empty"));
        }
        if self.redis.channel.is_empty() {
            return Err(SettingsError::invalid("redis.channel", "cannot be empty"));
        }

        let listener = &self.listener;
        if listener.initial_backoff_ms == 0 || listener.max_backoff_ms < listener.initial_backoff_ms
        {
            return Err(SettingsError::invalid(
                "listener.max_backoff_ms",
                "backoff bounds must satisfy 0 < initial <= max",
            ));
        }
        if !(1.0..=MAX_MULTIPLIER).contains(&listener.multiplier) {
            return Err(SettingsError::invalid(
                "listener.multiplier",
                "must be between 1.0 and 10.0",
            ));
        }

        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                SettingsError::invalid("server.host", e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigBuilder<DefaultState> {
        Config::builder()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_builder(builder()).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert!(settings.redis.enabled);
        assert_eq!(settings.redis.namespace, "projects");
        assert_eq!(settings.redis.channel, "cache_updates");
        assert_eq!(settings.origin.base_url, "https://api.github.com");
        assert_eq!(settings.origin.to_config().timeout, Duration::from_secs(10));
        assert_eq!(
            settings.listener.to_config().max_backoff,
            Duration::from_secs(30)
        );
        assert_eq!(
            settings.socket_addr().unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_builder(
            builder()
                .set_override("server.port", 9090)
                .unwrap()
                .set_override("redis.enabled", false)
                .unwrap()
                .set_override("redis.namespace", "repos")
                .unwrap()
                .set_override("origin.token", "secret")
                .unwrap(),
        )
        .unwrap();

        assert_eq!(settings.server.port, 9090);
        assert!(!settings.redis.enabled);
        assert_eq!(settings.redis.tier_names().namespace, "repos");
        assert_eq!(settings.origin.to_config().token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let settings = Settings {
            origin: OriginSettings {
                token: Some(String::new()),
                ..OriginSettings::default()
            },
            ..Settings::default()
        };
        assert!(settings.origin.to_config().token.is_none());
    }

    #[test]
    fn test_invalid_origin_scheme() {
        let result = Settings::from_builder(
            builder()
                .set_override("origin.base_url", "ftp://example.com")
                .unwrap(),
        );
        assert!(matches!(
            result,
            Err(SettingsError::Invalid {
                key: "origin.base_url",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_redis_url_only_checked_when_enabled() {
        let enabled = builder()
            .set_override("redis.url", "http://localhost")
            .unwrap();
        assert!(Settings::from_builder(enabled).is_err());

        let disabled = builder()
            .set_override("redis.url", "http://localhost")
            .unwrap()
            .set_override("redis.enabled", false)
            .unwrap();
        assert!(Settings::from_builder(disabled).is_ok());
    }

    #[test]
    fn test_invalid_backoff_bounds() {
        let result = Settings::from_builder(
            builder()
                .set_override("listener.initial_backoff_ms", 5000)
                .unwrap()
                .set_override("listener.max_backoff_ms", 1000)
                .unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_multiplier() {
        for multiplier in [0.5, 1e30, f64::INFINITY, f64::NAN] {
            let result = Settings::from_builder(
                builder()
                    .set_override("listener.multiplier", multiplier)
                    .unwrap(),
            );
            assert!(
                matches!(
                    result,
                    Err(SettingsError::Invalid {
                        key: "listener.multiplier",
                        ..
                    })
                ),
                "multiplier {multiplier} accepted"
            );
        }
    }

    #[test]
    fn test_invalid_host() {
        let result = Settings::from_builder(
            builder().set_override("server.host", "not a host").unwrap(),
        );
        assert!(matches!(
            result,
            Err(SettingsError::Invalid {
                key: "server.host",
                ..
            })
        ));
    }
}
