//! Route assembly: quota, cache, geocoding, routing fan-out, enrichment and
//! persistence for one planning request.

mod assemble;
mod links;

use std::iter;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use crate::assets::AssetUrls;
use crate::cache::{EtaMemo, ROUTE_TTL, TwoTierCache, coordinate_route_key, route_key};
use crate::format;
use crate::geocode::{
    GeocodeError, GeocodeResolver, GeocodeResult, GeocodingProvider, ReverseGeocoder,
    reverse_or_label,
};
use crate::geometry::{LatLng, POI_CORRIDOR_M};
use crate::output::{
    AddressInfo, FinalOutput, FuelEfficiency, FuelPrice, SimpleRouteFigures, SimpleRouteOutput,
    SimpleRouteSummary, Summary,
};
use crate::request::{
    CoordinateRouteRequest, RequestError, RouteRequest, Scope, SimpleRouteRequest, TripProfile,
};
use crate::routing::{Profile, RoutingEngine, RoutingError, fan_out};
use crate::store::{
    FavoriteRoute, HistoryKey, NewFavorite, QuotaDecision, RouteStore, SavedRoute, StoreError,
    saved_route_lifetime,
};

use assemble::{Assembly, minimal_route};
pub use assemble::arrival_estimate;
pub use links::{NavigationLinks, google_maps_url, waze_url};

/// Requests a public token may make per day unless configured otherwise.
pub const DEFAULT_PUBLIC_QUOTA_MAX: u32 = 2;

/// Deadline for POI matching and persistence.
pub const POI_DEADLINE: Duration = Duration::from_secs(120);

/// Failures of a lower layer that abort a request.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// The relational store failed.
    #[error("route store failed: {0}")]
    Store(#[from] StoreError),
    /// The geocoding provider failed.
    #[error(transparent)]
    Geocode(GeocodeError),
    /// A response or request could not be serialised.
    #[error("cannot serialise route document: {0}")]
    Json(#[from] serde_json::Error),
    /// Enrichment or persistence overran its deadline.
    #[error("route assembly exceeded {0:?}")]
    Deadline(Duration),
    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Reasons a planning request fails.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The request itself is invalid.
    #[error("{0}")]
    BadRequest(String),
    /// The public token used its daily allowance.
    #[error("você atingiu o limite de requisições por dia")]
    QuotaExceeded {
        /// Allowance per day.
        max: u32,
    },
    /// An address could not be geocoded.
    #[error(
        "Endereço não encontrado para: {raw}. Verifique se a pesquisa está escrita corretamente ou seja mais específico (Ex: {raw}, São Paulo)"
    )]
    AddressNotFound {
        /// Which stop failed: `origem`, `destino` or `parada`.
        which: &'static str,
        /// Address as supplied.
        raw: String,
    },
    /// A routing profile failed or returned nothing.
    #[error("serviço de rotas indisponível para o perfil {profile}: {source}")]
    RoutingUnavailable {
        /// Profile that failed first.
        profile: Profile,
        /// Underlying failure.
        #[source]
        source: RoutingError,
    },
    /// A lower layer failed.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

impl From<RequestError> for PlanError {
    fn from(err: RequestError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StoreError> for PlanError {
    fn from(err: StoreError) -> Self {
        Self::Dependency(DependencyError::Store(err))
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Dependency(DependencyError::Json(err))
    }
}

/// Identity headers of the caller, already authenticated upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    /// Public token id, for public requests.
    pub public_token_id: Option<i64>,
    /// User id, for private requests.
    pub user_id: Option<i64>,
}

impl Caller {
    /// Caller holding a public token.
    #[must_use]
    pub const fn public(token_id: i64) -> Self {
        Self {
            public_token_id: Some(token_id),
            user_id: None,
        }
    }

    /// Authenticated user.
    #[must_use]
    pub const fn user(user_id: i64) -> Self {
        Self {
            public_token_id: None,
            user_id: Some(user_id),
        }
    }
}

/// Tunables of the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Requests a public token may make per day.
    pub public_quota_max: u32,
    /// Matching corridor in metres.
    pub corridor_m: f64,
    /// Image hosts.
    pub assets: AssetUrls,
    /// Deadline for enrichment and persistence.
    pub poi_deadline: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            public_quota_max: DEFAULT_PUBLIC_QUOTA_MAX,
            corridor_m: POI_CORRIDOR_M,
            assets: AssetUrls::default(),
            poi_deadline: POI_DEADLINE,
        }
    }
}

/// External services the planner is wired to.
pub struct PlannerPorts {
    /// Relational store.
    pub store: Arc<dyn RouteStore>,
    /// Forward geocoder.
    pub geocoder: Arc<dyn GeocodingProvider>,
    /// Reverse geocoder.
    pub reverse: Arc<dyn ReverseGeocoder>,
    /// Routing engine.
    pub routing: Arc<dyn RoutingEngine>,
    /// Shared cache.
    pub cache: Arc<TwoTierCache>,
}

/// Request-independent facts about one planning job.
struct Job {
    cache_key: String,
    trip: TripProfile,
    owner: i64,
    waypoints_key: String,
    request_blob: String,
}

/// Resolved stops in travel order.
struct Stops {
    origin: GeocodeResult,
    destination: GeocodeResult,
    waypoints: Vec<GeocodeResult>,
    labels: Vec<String>,
}

impl Stops {
    fn path(&self) -> Vec<LatLng> {
        iter::once(self.origin.location)
            .chain(self.waypoints.iter().map(|stop| stop.location))
            .chain(iter::once(self.destination.location))
            .collect()
    }
}

/// Orchestrates a planning request end to end.
pub struct RoutePlanner {
    store: Arc<dyn RouteStore>,
    geocoder: GeocodeResolver,
    reverse: Arc<dyn ReverseGeocoder>,
    routing: Arc<dyn RoutingEngine>,
    cache: Arc<TwoTierCache>,
    eta: Arc<EtaMemo>,
    config: PlannerConfig,
}

impl std::fmt::Debug for RoutePlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutePlanner")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn persist(
    store: &dyn RouteStore,
    key: &HistoryKey,
    response_blob: &str,
    request_blob: &str,
    favorite: bool,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let id = store.upsert_route_hist(key, response_blob, now)?;
    let saved = store.insert_saved_route(&SavedRoute {
        origin: key.origin.clone(),
        destination: key.destination.clone(),
        waypoints_key: key.waypoints_key.clone(),
        request_blob: request_blob.to_owned(),
        response_blob: response_blob.to_owned(),
        expired_at: now + saved_route_lifetime(),
    })?;
    if !saved {
        debug!("saved route for {} -> {} already present", key.origin, key.destination);
    }
    if favorite {
        let favourite = NewFavorite {
            user_id: key.user_id,
            origin: key.origin.clone(),
            destination: key.destination.clone(),
            waypoints_key: key.waypoints_key.clone(),
            response_blob: response_blob.to_owned(),
        };
        if let Err(err) = store.insert_favorite(&favourite, now) {
            warn!("saving favourite for user {} failed: {err}", key.user_id);
        }
    }
    Ok(id)
}

impl RoutePlanner {
    /// Planner over `ports`.
    #[must_use]
    pub fn new(ports: PlannerPorts, config: PlannerConfig) -> Self {
        Self {
            store: ports.store,
            geocoder: GeocodeResolver::new(ports.geocoder, Arc::clone(&ports.cache)),
            reverse: ports.reverse,
            routing: ports.routing,
            cache: ports.cache,
            eta: Arc::new(EtaMemo::default()),
            config,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan an address-based request.
    ///
    /// # Errors
    ///
    /// See [`PlanError`]; any variant aborts the request.
    pub async fn plan(&self, request: RouteRequest, caller: Caller) -> Result<FinalOutput, PlanError> {
        let owner = self.admit(request.trip.scope, caller).await?;
        let job = Job {
            cache_key: route_key(
                &request.origin,
                &request.destination,
                &request.waypoints,
                request.trip.axles,
                request.trip.vehicle,
            ),
            request_blob: serde_json::to_string(&request)?,
            waypoints_key: request.waypoints_key().to_lowercase(),
            trip: request.trip,
            owner,
        };
        if let Some(hit) = self.cached(&job).await {
            return self.record(&job, hit).await;
        }

        let origin = self.resolve("origem", &request.origin).await?;
        let destination = self.resolve("destino", &request.destination).await?;
        let mut waypoints = Vec::with_capacity(request.waypoints.len());
        for stop in &request.waypoints {
            waypoints.push(self.resolve("parada", stop).await?);
        }
        let stops = Stops {
            origin,
            destination,
            waypoints,
            labels: request.waypoints,
        };
        self.compute(&job, stops).await
    }

    /// Plan a coordinate-based request.
    ///
    /// End points and waypoints are reverse geocoded for display; place
    /// lookups that fail leave the stop without a place id.
    ///
    /// # Errors
    ///
    /// See [`PlanError`].
    pub async fn plan_coordinates(
        &self,
        request: CoordinateRouteRequest,
        caller: Caller,
    ) -> Result<FinalOutput, PlanError> {
        let owner = self.admit(request.trip.scope, caller).await?;
        let waypoints_key = request
            .waypoints
            .iter()
            .map(|stop| stop.key_fragment())
            .collect::<Vec<_>>()
            .join(",");
        let job = Job {
            cache_key: coordinate_route_key(
                request.origin,
                request.destination,
                &request.waypoints,
                request.trip.axles,
                request.trip.vehicle,
            ),
            request_blob: serde_json::to_string(&request)?,
            trip: request.trip,
            owner,
            waypoints_key,
        };
        if let Some(hit) = self.cached(&job).await {
            return self.record(&job, hit).await;
        }

        let origin = self.locate(request.origin).await;
        let destination = self.locate(request.destination).await;
        let mut waypoints = Vec::with_capacity(request.waypoints.len());
        for stop in &request.waypoints {
            waypoints.push(self.locate(*stop).await);
        }
        let labels = waypoints
            .iter()
            .map(|stop| stop.formatted_address.clone())
            .collect();
        let stops = Stops {
            origin,
            destination,
            waypoints,
            labels,
        };
        self.compute(&job, stops).await
    }

    /// Distance and duration between two positions. No cache, no history.
    ///
    /// # Errors
    ///
    /// [`PlanError::BadRequest`] for invalid coordinates and
    /// [`PlanError::RoutingUnavailable`] when the engine fails.
    pub async fn simple_route(
        &self,
        request: &SimpleRouteRequest,
    ) -> Result<SimpleRouteOutput, PlanError> {
        let (origin, destination) = request.endpoints()?;
        let route = self
            .routing
            .simple_route(origin, destination)
            .await
            .map_err(|source| PlanError::RoutingUnavailable {
                profile: Profile::Fastest,
                source,
            })?;
        let origin_label = reverse_or_label(self.reverse.as_ref(), origin).await;
        let destination_label = reverse_or_label(self.reverse.as_ref(), destination).await;
        Ok(SimpleRouteOutput {
            summary: SimpleRouteSummary {
                location_origin: AddressInfo {
                    location: origin,
                    address: origin_label,
                },
                location_destination: AddressInfo {
                    location: destination,
                    address: destination_label,
                },
                routes: SimpleRouteFigures {
                    distance: format::distance(route.distance_m),
                    duration: format::duration(route.duration_s),
                },
            },
        })
    }

    /// Favourites of `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// [`PlanError::Dependency`] when the store fails.
    pub async fn favorites(&self, user_id: i64) -> Result<Vec<FavoriteRoute>, PlanError> {
        let store = Arc::clone(&self.store);
        Ok(self.blocking(move || store.list_favorites(user_id)).await??)
    }

    /// Remove favourite `id` owned by `user_id`; returns whether it existed.
    ///
    /// # Errors
    ///
    /// [`PlanError::Dependency`] when the store fails.
    pub async fn remove_favorite(&self, user_id: i64, id: i64) -> Result<bool, PlanError> {
        let store = Arc::clone(&self.store);
        Ok(self
            .blocking(move || store.remove_favorite(user_id, id))
            .await??)
    }

    /// Resolve the history owner and charge a public token's quota.
    async fn admit(&self, scope: Scope, caller: Caller) -> Result<i64, PlanError> {
        let presented = if scope.is_public() {
            caller.public_token_id
        } else {
            caller.user_id
        };
        let owner = presented
            .filter(|id| *id > 0)
            .ok_or_else(|| PlanError::BadRequest("ID inválido".to_owned()))?;
        if scope.is_public() {
            self.check_public_quota(owner).await?;
        }
        Ok(owner)
    }

    /// Charge one request to a public token.
    ///
    /// # Errors
    ///
    /// [`PlanError::BadRequest`] for a non-positive id,
    /// [`PlanError::QuotaExceeded`] when the allowance is used up.
    pub async fn check_public_quota(&self, token_id: i64) -> Result<(), PlanError> {
        if token_id <= 0 {
            return Err(PlanError::BadRequest("ID inválido".to_owned()));
        }
        let store = Arc::clone(&self.store);
        let max = self.config.public_quota_max;
        let decision = self
            .blocking(move || store.bump_public_quota(token_id, max, Utc::now()))
            .await??;
        match decision {
            QuotaDecision::Granted { used } => {
                debug!("public token {token_id} used {used}/{max}");
                Ok(())
            }
            QuotaDecision::Exhausted { used } => {
                info!("public token {token_id} exhausted ({used}/{max})");
                Err(PlanError::QuotaExceeded { max })
            }
        }
    }

    async fn cached(&self, job: &Job) -> Option<FinalOutput> {
        self.cache
            .get_json::<FinalOutput>(&job.cache_key, ROUTE_TTL)
            .await
            .filter(|hit| {
                let reusable = hit.summary.route_options == job.trip.options;
                if !reusable {
                    debug!("cached {} built with other options", job.cache_key);
                }
                reusable
            })
    }

    async fn resolve(&self, which: &'static str, raw: &str) -> Result<GeocodeResult, PlanError> {
        self.geocoder.resolve(raw).await.map_err(|err| match err {
            GeocodeError::NotFound { raw: address } => PlanError::AddressNotFound {
                which,
                raw: address,
            },
            other @ GeocodeError::Provider { .. } => DependencyError::Geocode(other).into(),
        })
    }

    async fn locate(&self, at: LatLng) -> GeocodeResult {
        let label = reverse_or_label(self.reverse.as_ref(), at).await;
        match self.geocoder.resolve(&label).await {
            Ok(found) => GeocodeResult {
                location: at,
                ..found
            },
            Err(err) => {
                warn!("no place id for {label}: {err}");
                GeocodeResult::unplaced(label, at)
            }
        }
    }

    async fn compute(&self, job: &Job, stops: Stops) -> Result<FinalOutput, PlanError> {
        let routes = fan_out(self.routing.as_ref(), &stops.path())
            .await
            .map_err(|err| PlanError::RoutingUnavailable {
                profile: err.profile,
                source: err.source,
            })?;

        let fastest_duration = routes.fastest.first().map_or(0.0, |route| route.duration_s);
        let links = NavigationLinks {
            google: google_maps_url(
                &stops.origin.formatted_address,
                &stops.destination.formatted_address,
                &stops.labels,
            ),
            waze: waze_url(
                &stops.origin,
                &stops.destination,
                stops.waypoints.first(),
                fastest_duration,
                Utc::now(),
            ),
        };

        let trip = &job.trip;
        let outputs = if trip.options.is_minimal() {
            minimal_route(&routes, trip, &links).into_iter().collect()
        } else {
            let assembly = Assembly {
                store: Arc::clone(&self.store),
                eta: Arc::clone(&self.eta),
                assets: self.config.assets.clone(),
                corridor_m: self.config.corridor_m,
                trip: trip.clone(),
                links,
            };
            self.blocking(move || assembly.run(&routes)).await?
        };
        info!(
            "planned {} -> {}: {} routes",
            stops.origin.formatted_address,
            stops.destination.formatted_address,
            outputs.len()
        );

        let output = FinalOutput {
            summary: Summary {
                location_origin: AddressInfo {
                    location: stops.origin.location,
                    address: stops.origin.formatted_address,
                },
                location_destination: AddressInfo {
                    location: stops.destination.location,
                    address: stops.destination.formatted_address,
                },
                all_stopping_points: stops.waypoints,
                fuel_price: FuelPrice::brl_per_litre(trip.fuel.price),
                fuel_efficiency: FuelEfficiency::km_per_litre(
                    trip.fuel.consumption_city,
                    trip.fuel.consumption_hwy,
                ),
                route_options: trip.options,
                route_hist_id: 0,
            },
            routes: outputs,
        };
        self.cache.put_json(&job.cache_key, &output, ROUTE_TTL).await;
        self.record(job, output).await
    }

    async fn record(&self, job: &Job, mut output: FinalOutput) -> Result<FinalOutput, PlanError> {
        let response_blob = serde_json::to_string(&output)?;
        let key = HistoryKey {
            user_id: job.owner,
            origin: output.summary.location_origin.address.clone(),
            destination: output.summary.location_destination.address.clone(),
            waypoints_key: job.waypoints_key.clone(),
            is_public: job.trip.scope.is_public(),
        };
        let store = Arc::clone(&self.store);
        let request_blob = job.request_blob.clone();
        let favorite = job.trip.favorite;
        let id = self
            .blocking(move || {
                persist(
                    store.as_ref(),
                    &key,
                    &response_blob,
                    &request_blob,
                    favorite,
                    Utc::now(),
                )
            })
            .await??;
        output.summary.route_hist_id = id;
        Ok(output)
    }

    /// Run `job` on the blocking pool under the enrichment deadline.
    async fn blocking<T, F>(&self, job: F) -> Result<T, PlanError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let deadline = self.config.poi_deadline;
        match tokio::time::timeout(deadline, tokio::task::spawn_blocking(job)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join)) => Err(DependencyError::Task(join).into()),
            Err(_) => Err(DependencyError::Deadline(deadline).into()),
        }
    }
}

#[cfg(test)]
mod tests;
