//! Address resolution with state aliasing and write-through caching.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{GEOCODE_TTL, TwoTierCache, geocode_key};
use crate::geometry::LatLng;

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Provider's formatted address.
    pub formatted_address: String,
    /// Provider place identifier; empty when unknown.
    pub place_id: String,
    /// Position.
    pub location: LatLng,
}

impl GeocodeResult {
    /// A result for a bare coordinate labelled `label`, with no place id.
    #[must_use]
    pub fn unplaced(label: impl Into<String>, location: LatLng) -> Self {
        Self {
            formatted_address: label.into(),
            place_id: String::new(),
            location,
        }
    }
}

/// Errors raised while resolving addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    /// The provider found nothing for the address.
    #[error(
        "Endereço não encontrado para: {raw}. Verifique se a pesquisa está escrita corretamente ou seja mais específico (Ex: {raw}, São Paulo)"
    )]
    NotFound {
        /// Address as the caller supplied it.
        raw: String,
    },
    /// The provider could not be reached or answered with an error.
    #[error("geocoding provider failed: {message}")]
    Provider {
        /// Failure description.
        message: String,
    },
}

/// Forward geocoding service.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Best autocomplete prediction for `input`, if any.
    async fn autocomplete(&self, input: &str) -> Result<Option<String>, GeocodeError>;

    /// First geocode result for `address`, if any.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeResult>, GeocodeError>;
}

/// Reverse geocoding service.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Display name of the place at `at`.
    async fn reverse(&self, at: LatLng) -> Result<String, GeocodeError>;
}

/// Brazilian states, with and without accents, mapped to their capitals.
const STATE_CAPITALS: &[(&[&str], &str)] = &[
    (&["acre"], "Rio Branco, Acre"),
    (&["alagoas"], "Maceió, Alagoas"),
    (&["amapá", "amapa"], "Macapá, Amapá"),
    (&["amazonas"], "Manaus, Amazonas"),
    (&["bahia"], "Salvador, Bahia"),
    (&["ceará", "ceara"], "Fortaleza, Ceará"),
    (&["espírito santo", "espirito santo"], "Vitória, Espírito Santo"),
    (&["goiás", "goias"], "Goiânia, Goiás"),
    (&["maranhão", "maranhao"], "São Luís, Maranhão"),
    (&["mato grosso"], "Cuiabá, Mato Grosso"),
    (&["mato grosso do sul"], "Campo Grande, Mato Grosso do Sul"),
    (&["minas gerais"], "Belo Horizonte, Minas Gerais"),
    (&["pará", "para"], "Belém, Pará"),
    (&["paraíba", "paraiba"], "João Pessoa, Paraíba"),
    (&["paraná", "parana"], "Curitiba, Paraná"),
    (&["pernambuco"], "Recife, Pernambuco"),
    (&["piauí", "piaui"], "Teresina, Piauí"),
    (&["rio de janeiro"], "Rio de Janeiro, Rio de Janeiro"),
    (&["rio grande do norte"], "Natal, Rio Grande do Norte"),
    (&["rio grande do sul"], "Porto Alegre, Rio Grande do Sul"),
    (&["rondônia", "rondonia"], "Porto Velho, Rondônia"),
    (&["roraima"], "Boa Vista, Roraima"),
    (&["santa catarina"], "Florianópolis, Santa Catarina"),
    (&["são paulo", "sao paulo"], "Praça da Sé, São Paulo"),
    (&["sergipe"], "Aracaju, Sergipe"),
    (&["tocantins"], "Palmas, Tocantins"),
    (&["distrito federal"], "Brasília, Distrito Federal"),
];

/// Lowercase and trim an address, replacing a bare state name with its
/// capital. Only the text before the first comma is checked for a state.
///
/// # Examples
///
/// ```
/// use tollroute_core::geocode::normalise_address;
///
/// assert_eq!(normalise_address(" Bahia "), "Salvador, Bahia");
/// assert_eq!(normalise_address("Sao Paulo, Brasil"), "Praça da Sé, São Paulo");
/// assert_eq!(normalise_address("Rua XV, Curitiba"), "rua xv, curitiba");
/// ```
#[must_use]
pub fn normalise_address(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let head = lowered
        .split_once(',')
        .map_or(lowered.as_str(), |(head, _)| head)
        .trim();
    let capital = STATE_CAPITALS
        .iter()
        .find(|(names, _)| names.contains(&head))
        .map(|(_, capital)| *capital);
    capital.map_or(lowered, str::to_owned)
}

/// Cached forward geocoding.
pub struct GeocodeResolver {
    provider: Arc<dyn GeocodingProvider>,
    cache: Arc<TwoTierCache>,
}

impl std::fmt::Debug for GeocodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodeResolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl GeocodeResolver {
    /// Resolver using `provider` behind `cache`.
    #[must_use]
    pub fn new(provider: Arc<dyn GeocodingProvider>, cache: Arc<TwoTierCache>) -> Self {
        Self { provider, cache }
    }

    /// Resolve a free-text address.
    ///
    /// The normalised address is looked up in the cache first. On a miss the
    /// provider's autocomplete refines the query, the refined query is
    /// geocoded and the result is cached.
    ///
    /// # Errors
    ///
    /// [`GeocodeError::NotFound`] when the provider finds nothing, or
    /// [`GeocodeError::Provider`] when geocoding itself fails. Autocomplete
    /// failures are logged and skipped.
    pub async fn resolve(&self, raw: &str) -> Result<GeocodeResult, GeocodeError> {
        let normalised = normalise_address(raw);
        let key = geocode_key(&normalised);
        if let Some(hit) = self.cache.get_json::<GeocodeResult>(&key, GEOCODE_TTL).await {
            debug!("geocode cache hit for {normalised}");
            return Ok(hit);
        }

        let query = match self.provider.autocomplete(&normalised).await {
            Ok(Some(prediction)) => prediction,
            Ok(None) => normalised.clone(),
            Err(err) => {
                warn!("autocomplete failed for {normalised}: {err}");
                normalised.clone()
            }
        };

        let result = self
            .provider
            .geocode(&query)
            .await?
            .ok_or_else(|| GeocodeError::NotFound {
                raw: raw.trim().to_owned(),
            })?;
        self.cache.put_json(&key, &result, GEOCODE_TTL).await;
        Ok(result)
    }
}

/// Label used for a coordinate that could not be reverse geocoded.
#[must_use]
pub fn coordinate_label(at: LatLng) -> String {
    format!("{:.6}, {:.6}", at.lat, at.lng)
}

/// Reverse geocode `at`, falling back to its coordinate label.
pub async fn reverse_or_label(reverse: &dyn ReverseGeocoder, at: LatLng) -> String {
    match reverse.reverse(at).await {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => coordinate_label(at),
        Err(err) => {
            warn!("reverse geocoding {at:?} failed: {err}");
            coordinate_label(at)
        }
    }
}
