//! HTTP client for the OSRM `route` service.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use tollroute_core::LatLng;
use tollroute_core::routing::{
    Profile, RoutingAlternative, RoutingEngine, RoutingError, SIMPLE_ROUTE_QUERY, SimpleRoute,
    coordinate_path,
};

use super::osrm::RouteResponse;
use crate::{DEFAULT_USER_AGENT, ProviderBuildError, http_client};

/// Default request timeout. Long truck routes across Brazil take a while to
/// compute with three alternatives and steps.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for [`OsrmRoutingEngine`].
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Base URL of the OSRM service, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OsrmConfig {
    /// Configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`RoutingEngine`] backed by OSRM's driving profile.
///
/// # Example
///
/// ```no_run
/// use tollroute_core::{LatLng, Profile, RoutingEngine};
/// use tollroute_data::routing::OsrmRoutingEngine;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = OsrmRoutingEngine::new("http://localhost:5000")?;
/// let path = [LatLng::new(-15.60, -56.10), LatLng::new(-23.55, -46.63)];
/// let alternatives = engine.route(Profile::Cheapest, &path).await?;
/// # let _ = alternatives;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OsrmRoutingEngine {
    client: Client,
    config: OsrmConfig,
}

impl OsrmRoutingEngine {
    /// Engine with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OsrmConfig::new(base_url))
    }

    /// Engine with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_config(config: OsrmConfig) -> Result<Self, ProviderBuildError> {
        let client = http_client(&config.user_agent, config.timeout)?;
        Ok(Self { client, config })
    }

    /// Route service URL: `{base_url}/route/v1/driving/{lng,lat;...}?{query}`.
    fn build_route_url(&self, path: &[LatLng], query: &str) -> String {
        format!(
            "{}/route/v1/driving/{}?{}",
            self.config.base_url.trim_end_matches('/'),
            coordinate_path(path),
            query
        )
    }

    async fn fetch(&self, path: &[LatLng], query: &str) -> Result<RouteResponse, RoutingError> {
        if path.len() < 2 {
            return Err(RoutingError::TooFewPoints { count: path.len() });
        }
        let url = self.build_route_url(path, query);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err))?;
        // OSRM reports NoRoute and friends with a 400 and a JSON body, so the
        // body is read before the status is judged.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| convert_reqwest_error(&err))?;
        match serde_json::from_str::<RouteResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(RoutingError::Http {
                status: status.as_u16(),
            }),
            Err(err) => Err(RoutingError::Decode {
                message: err.to_string(),
            }),
        }
    }
}

/// Map transport failures onto [`RoutingError`].
fn convert_reqwest_error(error: &reqwest::Error) -> RoutingError {
    if error.is_timeout() {
        return RoutingError::Timeout;
    }
    if let Some(status) = error.status() {
        return RoutingError::Http {
            status: status.as_u16(),
        };
    }
    RoutingError::Network {
        message: error.to_string(),
    }
}

/// Reject non-`Ok` answers and convert the routes.
fn convert_response(response: RouteResponse) -> Result<Vec<RoutingAlternative>, RoutingError> {
    if !response.is_ok() {
        return Err(RoutingError::Rejected {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    Ok(response
        .routes
        .into_iter()
        .map(RoutingAlternative::from)
        .collect())
}

#[async_trait]
impl RoutingEngine for OsrmRoutingEngine {
    async fn route(
        &self,
        profile: Profile,
        path: &[LatLng],
    ) -> Result<Vec<RoutingAlternative>, RoutingError> {
        let response = self.fetch(path, profile.query()).await?;
        convert_response(response)
    }

    async fn simple_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<SimpleRoute, RoutingError> {
        let response = self
            .fetch(&[origin, destination], SIMPLE_ROUTE_QUERY)
            .await?;
        let first = convert_response(response)?
            .into_iter()
            .next()
            .ok_or(RoutingError::NoRoutes)?;
        Ok(SimpleRoute {
            distance_m: first.distance_m,
            duration_s: first.duration_s,
        })
    }
}
