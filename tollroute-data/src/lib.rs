//! Network and file adapters for the toll route planner.
//!
//! Each adapter implements one port of `tollroute-core` over HTTP:
//!
//! - [`routing::OsrmRoutingEngine`] talks to an OSRM `route` service.
//! - [`geocoding::GoogleGeocoder`] resolves addresses through Google's Places
//!   autocomplete and Geocoding APIs.
//! - [`geocoding::NominatimReverseGeocoder`] names coordinates.
//! - [`cache::RedisRestCache`] stores cache entries in a Redis REST gateway.
//!
//! [`seed::load_seed`] reads POI tables from a JSON document for loading into
//! the SQLite store.

pub mod cache;
pub mod geocoding;
pub mod routing;
pub mod seed;

use std::time::Duration;

use thiserror::Error;

/// User agent sent by every adapter.
pub const DEFAULT_USER_AGENT: &str = concat!("tollroute/", env!("CARGO_PKG_VERSION"));

/// Error raised while constructing an adapter.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The configured base URL is not a URL.
    #[error("invalid base URL {url}: {source}")]
    BaseUrl {
        /// URL as configured.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

/// Build a client with the shared user agent and `timeout`.
pub(crate) fn http_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<reqwest::Client, ProviderBuildError> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?)
}

/// Parse `raw` as a base URL, dropping any trailing slash.
pub(crate) fn base_url(raw: &str) -> Result<url::Url, ProviderBuildError> {
    url::Url::parse(raw.trim_end_matches('/')).map_err(|source| ProviderBuildError::BaseUrl {
        url: raw.to_owned(),
        source,
    })
}
