//! Nominatim reverse geocoding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tollroute_core::{GeocodeError, LatLng, ReverseGeocoder};
use url::Url;

use super::provider_error;
use crate::{DEFAULT_USER_AGENT, ProviderBuildError, base_url, http_client};

/// Public Nominatim instance.
pub const NOMINATIM_API: &str = "https://nominatim.openstreetmap.org";

/// Configuration for [`NominatimReverseGeocoder`].
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Base URL of the Nominatim instance.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent; the public instance rejects anonymous clients.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_API.to_owned(),
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl NominatimConfig {
    /// Configuration for the instance at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`ReverseGeocoder`] backed by Nominatim.
#[derive(Debug)]
pub struct NominatimReverseGeocoder {
    client: Client,
    reverse_url: Url,
}

impl NominatimReverseGeocoder {
    /// Build a reverse geocoder from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(config: &NominatimConfig) -> Result<Self, ProviderBuildError> {
        let base = base_url(&config.base_url)?;
        let joined = format!("{}/reverse", base.as_str().trim_end_matches('/'));
        let reverse_url = Url::parse(&joined).map_err(|source| ProviderBuildError::BaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let client = http_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            reverse_url,
        })
    }

    fn build_url(&self, at: LatLng) -> Url {
        let mut url = self.reverse_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("lat", &format!("{:.6}", at.lat))
            .append_pair("lon", &format!("{:.6}", at.lng));
        url
    }
}

fn convert_response(response: ReverseResponse) -> Result<String, GeocodeError> {
    match (response.display_name, response.error) {
        (Some(name), _) => Ok(name),
        (None, Some(message)) => Err(GeocodeError::Provider {
            message: format!("nominatim answered: {message}"),
        }),
        (None, None) => Ok(String::new()),
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimReverseGeocoder {
    async fn reverse(&self, at: LatLng) -> Result<String, GeocodeError> {
        let response: ReverseResponse = self
            .client
            .get(self.build_url(at))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| provider_error("nominatim", &err))?
            .json()
            .await
            .map_err(|err| GeocodeError::Provider {
                message: format!("nominatim reply malformed: {err}"),
            })?;
        convert_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NOMINATIM_API)]
    #[case("https://nominatim.openstreetmap.org/")]
    fn builds_reverse_url(#[case] base: &str) {
        let geocoder = NominatimReverseGeocoder::with_config(&NominatimConfig::new(base))
            .expect("geocoder builds");
        let url = geocoder.build_url(LatLng::new(-23.5505, -46.6333));
        assert_eq!(
            url.as_str(),
            "https://nominatim.openstreetmap.org/reverse?format=json&lat=-23.550500&lon=-46.633300"
        );
    }

    #[rstest]
    fn display_name_wins() {
        let response: ReverseResponse =
            serde_json::from_str(r#"{"display_name": "Sé, São Paulo, Brasil", "lat": "-23.55"}"#)
                .expect("parses");
        assert_eq!(convert_response(response).expect("ok"), "Sé, São Paulo, Brasil");
    }

    #[rstest]
    fn error_body_is_provider_error() {
        let response: ReverseResponse =
            serde_json::from_str(r#"{"error": "Unable to geocode"}"#).expect("parses");
        assert!(matches!(
            convert_response(response),
            Err(GeocodeError::Provider { .. })
        ));
    }
}
