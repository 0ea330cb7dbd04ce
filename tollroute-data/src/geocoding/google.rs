//! Google Places autocomplete and Geocoding API client.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tollroute_core::{GeocodeError, GeocodeResult, GeocodingProvider, LatLng};
use url::Url;

use super::provider_error;
use crate::{DEFAULT_USER_AGENT, ProviderBuildError, base_url, http_client};

/// Public endpoint of the Google Maps web services.
pub const GOOGLE_MAPS_API: &str = "https://maps.googleapis.com/maps/api";

/// Autocomplete bias: the geographic centre of Brazil with a radius that
/// covers the country.
const BIAS_LOCATION: &str = "-14.2350,-51.9253";
const BIAS_RADIUS_M: &str = "1000000";

/// Configuration for [`GoogleGeocoder`].
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// API key sent as the `key` parameter.
    pub api_key: String,
    /// Base URL of the web services.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl GoogleConfig {
    /// Configuration for the public endpoint using `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GOOGLE_MAPS_API.to_owned(),
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Point the client somewhere other than Google, e.g. a test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status-bearing envelope shared by both APIs.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default = "Vec::new")]
    predictions: Vec<T>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

impl<T> Envelope<T> {
    /// Items of a successful answer; `ZERO_RESULTS` is an empty success.
    fn into_items(self) -> Result<Vec<T>, GeocodeError> {
        match self.status.as_str() {
            "OK" => {
                let mut items = self.predictions;
                items.extend(self.results);
                Ok(items)
            }
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(GeocodeError::Provider {
                message: self.error_message.map_or_else(
                    || format!("google answered {other}"),
                    |detail| format!("google answered {other}: {detail}"),
                ),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    description: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    formatted_address: String,
    place_id: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

impl From<GeocodeHit> for GeocodeResult {
    fn from(hit: GeocodeHit) -> Self {
        Self {
            formatted_address: hit.formatted_address,
            place_id: hit.place_id,
            location: LatLng::new(hit.geometry.location.lat, hit.geometry.location.lng),
        }
    }
}

/// [`GeocodingProvider`] backed by Google Maps.
pub struct GoogleGeocoder {
    client: Client,
    base: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("base", &self.base)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GoogleGeocoder {
    /// Build a geocoder from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(config: GoogleConfig) -> Result<Self, ProviderBuildError> {
        let base = base_url(&config.base_url)?;
        let client = http_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_owned(),
            api_key: config.api_key,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, GeocodeError> {
        let mut url = Url::parse(&format!("{}/{path}", self.base)).map_err(|err| {
            GeocodeError::Provider {
                message: err.to_string(),
            }
        })?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, GeocodeError> {
        debug!("GET {}", url.path());
        let envelope: Envelope<T> = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| provider_error("google", &err))?
            .json()
            .await
            .map_err(|err| GeocodeError::Provider {
                message: format!("google reply malformed: {err}"),
            })?;
        envelope.into_items()
    }
}

#[async_trait]
impl GeocodingProvider for GoogleGeocoder {
    async fn autocomplete(&self, input: &str) -> Result<Option<String>, GeocodeError> {
        let url = self.endpoint(
            "place/autocomplete/json",
            &[
                ("input", input),
                ("location", BIAS_LOCATION),
                ("radius", BIAS_RADIUS_M),
                ("language", "pt-BR"),
                ("types", "geocode"),
            ],
        )?;
        let predictions: Vec<Prediction> = self.call(url).await?;
        Ok(predictions
            .into_iter()
            .next()
            .map(|prediction| prediction.description))
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        let url = self.endpoint("geocode/json", &[("address", address), ("region", "br")])?;
        let hits: Vec<GeocodeHit> = self.call(url).await?;
        Ok(hits.into_iter().next().map(GeocodeResult::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn geocoder() -> GoogleGeocoder {
        GoogleGeocoder::with_config(
            GoogleConfig::new("secret").with_base_url("http://maps.example.com/api/"),
        )
        .expect("geocoder builds")
    }

    #[rstest]
    fn endpoint_encodes_parameters(geocoder: GoogleGeocoder) {
        let url = geocoder
            .endpoint("geocode/json", &[("address", "Praça da Sé, São Paulo"), ("region", "br")])
            .expect("url");
        assert_eq!(url.path(), "/api/geocode/json");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("address".to_owned(), "Praça da Sé, São Paulo".to_owned()),
                ("region".to_owned(), "br".to_owned()),
                ("key".to_owned(), "secret".to_owned()),
            ]
        );
    }

    #[rstest]
    fn debug_redacts_api_key(geocoder: GoogleGeocoder) {
        assert!(!format!("{geocoder:?}").contains("secret"));
    }

    #[rstest]
    fn geocode_hit_converts_to_result() {
        let json = r#"{
            "status": "OK",
            "results": [{
                "formatted_address": "Cuiabá - MT, Brasil",
                "place_id": "ChIJ-cuiaba",
                "geometry": {"location": {"lat": -15.6014, "lng": -56.0979}}
            }]
        }"#;
        let envelope: Envelope<GeocodeHit> = serde_json::from_str(json).expect("parses");
        let hit = envelope.into_items().expect("ok").into_iter().next().expect("hit");
        let result = GeocodeResult::from(hit);
        assert_eq!(result.place_id, "ChIJ-cuiaba");
        assert_eq!(result.location, LatLng::new(-15.6014, -56.0979));
    }

    #[rstest]
    fn zero_results_is_empty_success() {
        let json = r#"{"status": "ZERO_RESULTS", "predictions": []}"#;
        let envelope: Envelope<Prediction> = serde_json::from_str(json).expect("parses");
        assert!(envelope.into_items().expect("ok").is_empty());
    }

    #[rstest]
    #[case(r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#, "google answered REQUEST_DENIED: bad key")]
    #[case(r#"{"status": "OVER_QUERY_LIMIT"}"#, "google answered OVER_QUERY_LIMIT")]
    fn failing_status_is_provider_error(#[case] json: &str, #[case] expected: &str) {
        let envelope: Envelope<Prediction> = serde_json::from_str(json).expect("parses");
        let err = envelope.into_items().expect_err("must fail");
        assert_eq!(
            err,
            GeocodeError::Provider {
                message: expected.to_owned()
            }
        );
    }
}
