//! Remote cache tier over a Redis REST gateway.
//!
//! The gateway exposes Redis commands as URL paths in the style of Upstash
//! and Webdis: `GET {base}/get/{key}` answers `{"result": "value"}` or
//! `{"result": null}`, and `POST {base}/set/{key}/EX/{seconds}` stores the
//! request body. Requests carry a bearer token when one is configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tollroute_core::RemoteCache;
use tollroute_core::cache::CacheError;
use url::Url;

use crate::{DEFAULT_USER_AGENT, ProviderBuildError, base_url, http_client};

/// Configuration for [`RedisRestCache`].
#[derive(Debug, Clone)]
pub struct RedisRestConfig {
    /// Gateway URL.
    pub base_url: String,
    /// Bearer token, if the gateway requires one.
    pub token: Option<String>,
    /// Request timeout; short because the cache is best effort.
    pub timeout: Duration,
}

impl RedisRestConfig {
    /// Configuration for the gateway at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(2),
        }
    }

    /// Authenticate with `token`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// [`RemoteCache`] speaking to a Redis REST gateway.
pub struct RedisRestCache {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl std::fmt::Debug for RedisRestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRestCache")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl RedisRestCache {
    /// Build a cache client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(config: RedisRestConfig) -> Result<Self, ProviderBuildError> {
        let base = base_url(&config.base_url)?;
        let client = http_client(DEFAULT_USER_AGENT, config.timeout)?;
        Ok(Self {
            client,
            base,
            token: config.token,
        })
    }

    /// `{base}/{segment}/...` with each segment percent-encoded, so a key
    /// always stays one path segment.
    fn command_url(&self, segments: &[&str]) -> Result<Url, CacheError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CacheError::Malformed {
                message: format!("{} cannot take path segments", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        self.token
            .iter()
            .fold(request, |builder, token| builder.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Reply, CacheError> {
        let response = self
            .authorised(request)
            .send()
            .await
            .map_err(|err| CacheError::Unavailable {
                message: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::Status {
                status: status.as_u16(),
            });
        }
        let mut reply: Reply = response.json().await.map_err(|err| CacheError::Malformed {
            message: err.to_string(),
        })?;
        if let Some(message) = reply.error.take() {
            return Err(CacheError::Malformed { message });
        }
        Ok(reply)
    }
}

fn stored_value(reply: Reply) -> Result<Option<String>, CacheError> {
    match reply.result {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(CacheError::Malformed {
            message: format!("expected a string, got {other}"),
        }),
    }
}

#[async_trait]
impl RemoteCache for RedisRestCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let url = self.command_url(&["get", key])?;
        let reply = self.send(self.client.get(url)).await?;
        stored_value(reply)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let seconds = ttl.as_secs().max(1).to_string();
        let url = self.command_url(&["set", key, "EX", &seconds])?;
        self.send(self.client.post(url).body(value.to_owned()))
            .await
            .map(drop)
    }
}
