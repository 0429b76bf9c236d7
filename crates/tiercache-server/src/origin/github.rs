//! GitHub-style REST origin (`GET {base}/repos/{org}/{repo}`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use tiercache_core::CacheValue;
use tracing::debug;

use super::{OriginError, OriginFetcher, validate_payload};

/// Configuration for the origin client.
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// Base URL of the API (e.g., "https://api.github.com").
    pub base_url: String,
    /// Hard timeout for a whole request, body included.
    pub timeout: Duration,
    /// User-Agent header; GitHub rejects requests without one.
    pub user_agent: String,
    /// Optional bearer token, raises the origin's rate limit.
    pub token: Option<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("tiercache/{}", env!("CARGO_PKG_VERSION")),
            token: None,
        }
    }
}

/// Origin fetcher for repository metadata.
pub struct GithubOrigin {
    client: Client,
    base_url: Url,
    timeout: Duration,
    token: Option<String>,
}

impl GithubOrigin {
    /// Builds the HTTP client from the configuration.
    pub fn new(config: OriginConfig) -> Result<Self, OriginError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| OriginError::InvalidConfig(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(OriginError::InvalidConfig(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| OriginError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
            token: config.token,
        })
    }

    /// Builds `{base}/repos/{org}/{repo}`, percent-encoding both components.
    fn repo_url(&self, org: &str, repo: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["repos", org, repo]);
        }
        url
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> OriginError {
        if err.is_timeout() {
            OriginError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            OriginError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl OriginFetcher for GithubOrigin {
    async fn fetch(&self, org: &str, repo: &str) -> Result<CacheValue, OriginError> {
        let url = self.repo_url(org, repo);
        debug!(url = %url, "Fetching from origin");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(OriginError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        validate_payload(&body)?;

        Ok(CacheValue::from(body.as_ref()))
    }

    fn name(&self) -> &str {
        "github"
    }
}
