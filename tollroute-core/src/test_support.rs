//! In-memory stand-ins for every port, used by unit and behaviour tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{Coord, Intersects, Rect};

use crate::geocode::{GeocodeError, GeocodeResult, GeocodingProvider, ReverseGeocoder};
use crate::geometry::{LatLng, haversine_m};
use crate::instructions::{Maneuver, ManeuverKind, Modifier};
use crate::poi::{FreightLoadRow, FuelStation, Toll, TollTag, WeighStation};
use crate::polyline;
use crate::routing::{Profile, RoutingAlternative, RoutingEngine, RoutingError, SimpleRoute};
use crate::store::{
    FavoriteRoute, HistoryKey, NewFavorite, PoiSeed, PublicQuota, QuotaDecision, RouteHistory,
    RouteStore, SavedRoute, StoreError, decide_quota,
};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MemoryState {
    seed: PoiSeed,
    history: Vec<RouteHistory>,
    saved: Vec<SavedRoute>,
    favorites: Vec<FavoriteRoute>,
    quotas: HashMap<i64, PublicQuota>,
    next_id: i64,
}

impl MemoryState {
    const fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`RouteStore`].
///
/// Linear scans throughout; intended only for small fixtures.
#[derive(Debug, Default)]
pub struct MemoryRouteStore {
    state: Mutex<MemoryState>,
    failing_lookups: bool,
}

impl MemoryRouteStore {
    /// Store holding the given POI rows.
    #[must_use]
    pub fn with_seed(seed: PoiSeed) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                seed,
                ..MemoryState::default()
            }),
            failing_lookups: false,
        }
    }

    /// Make every POI, tag and freight lookup fail.
    #[must_use]
    pub const fn with_failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    /// Install a quota row for a public token.
    pub fn set_quota(&self, quota: PublicQuota) {
        guard(&self.state).quotas.insert(quota.id, quota);
    }

    /// Every history row.
    #[must_use]
    pub fn history(&self) -> Vec<RouteHistory> {
        guard(&self.state).history.clone()
    }

    /// Every saved route.
    #[must_use]
    pub fn saved_routes(&self) -> Vec<SavedRoute> {
        guard(&self.state).saved.clone()
    }

    fn lookup<T: Clone>(&self, select: impl FnOnce(&PoiSeed) -> Vec<T>) -> Result<Vec<T>, StoreError> {
        if self.failing_lookups {
            return Err(StoreError::Poisoned);
        }
        Ok(select(&guard(&self.state).seed))
    }
}

impl RouteStore for MemoryRouteStore {
    fn get_tolls(&self) -> Result<Vec<Toll>, StoreError> {
        self.lookup(|seed| seed.tolls.clone())
    }

    fn get_toll_tags(&self) -> Result<Vec<TollTag>, StoreError> {
        self.lookup(|seed| seed.toll_tags.clone())
    }

    fn get_balanca(&self) -> Result<Vec<WeighStation>, StoreError> {
        self.lookup(|seed| seed.weigh_stations.clone())
    }

    fn get_gas_stations_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<FuelStation>, StoreError> {
        let area = *bbox;
        self.lookup(|seed| {
            seed.fuel_stations
                .iter()
                // `Intersects` treats boundary points as inside the rectangle.
                .filter(|station| area.intersects(&Coord::from(station.location)))
                .cloned()
                .collect()
        })
    }

    fn get_freight_loads(&self) -> Result<Vec<FreightLoadRow>, StoreError> {
        self.lookup(|seed| seed.freight_loads.clone())
    }

    fn upsert_route_hist(
        &self,
        key: &HistoryKey,
        response_blob: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut state = guard(&self.state);
        if let Some(row) = state.history.iter_mut().find(|row| &row.key == key) {
            row.number_request += 1;
            return Ok(row.id);
        }
        let id = state.allocate_id();
        state.history.push(RouteHistory {
            id,
            key: key.clone(),
            response_blob: response_blob.to_owned(),
            number_request: 1,
            created_at: now,
        });
        Ok(id)
    }

    fn insert_saved_route(&self, route: &SavedRoute) -> Result<bool, StoreError> {
        let mut state = guard(&self.state);
        let exists = state.saved.iter().any(|saved| {
            saved.origin == route.origin
                && saved.destination == route.destination
                && saved.waypoints_key == route.waypoints_key
        });
        if exists {
            return Ok(false);
        }
        state.saved.push(route.clone());
        Ok(true)
    }

    fn insert_favorite(
        &self,
        favorite: &NewFavorite,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut state = guard(&self.state);
        let id = state.allocate_id();
        state.favorites.push(FavoriteRoute {
            id,
            user_id: favorite.user_id,
            origin: favorite.origin.clone(),
            destination: favorite.destination.clone(),
            waypoints_key: favorite.waypoints_key.clone(),
            response_blob: favorite.response_blob.clone(),
            created_at: now,
        });
        Ok(id)
    }

    fn list_favorites(&self, user_id: i64) -> Result<Vec<FavoriteRoute>, StoreError> {
        let mut owned: Vec<FavoriteRoute> = guard(&self.state)
            .favorites
            .iter()
            .filter(|favorite| favorite.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    fn remove_favorite(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut state = guard(&self.state);
        let before = state.favorites.len();
        state
            .favorites
            .retain(|favorite| !(favorite.id == id && favorite.user_id == user_id));
        Ok(state.favorites.len() < before)
    }

    fn get_public_quota(&self, token_id: i64) -> Result<Option<PublicQuota>, StoreError> {
        Ok(guard(&self.state).quotas.get(&token_id).cloned())
    }

    fn bump_public_quota(
        &self,
        token_id: i64,
        max: u32,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, StoreError> {
        let mut state = guard(&self.state);
        let current = state.quotas.get(&token_id).cloned();
        let (decision, updated) = decide_quota(current, token_id, max, now);
        if let Some(quota) = updated {
            state.quotas.insert(token_id, quota);
        }
        Ok(decision)
    }
}

/// Forward geocoder answering from fixed tables.
///
/// Predictions are looked up case-insensitively; places by exact query.
#[derive(Debug, Default)]
pub struct FixtureGeocoder {
    predictions: HashMap<String, String>,
    places: HashMap<String, GeocodeResult>,
    geocode_calls: AtomicUsize,
    failing: bool,
}

impl FixtureGeocoder {
    /// Add an autocomplete prediction for `input`.
    #[must_use]
    pub fn with_prediction(mut self, input: &str, prediction: &str) -> Self {
        self.predictions
            .insert(input.to_lowercase(), prediction.to_owned());
        self
    }

    /// Add a geocode result for `query`.
    #[must_use]
    pub fn with_place(
        mut self,
        query: &str,
        formatted_address: &str,
        place_id: &str,
        location: LatLng,
    ) -> Self {
        self.places.insert(
            query.to_owned(),
            GeocodeResult {
                formatted_address: formatted_address.to_owned(),
                place_id: place_id.to_owned(),
                location,
            },
        );
        self
    }

    /// Geocoder whose every call fails with a provider error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Number of geocode calls served so far.
    #[must_use]
    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingProvider for FixtureGeocoder {
    async fn autocomplete(&self, input: &str) -> Result<Option<String>, GeocodeError> {
        if self.failing {
            return Err(GeocodeError::Provider {
                message: "autocomplete offline".to_owned(),
            });
        }
        Ok(self.predictions.get(&input.to_lowercase()).cloned())
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(GeocodeError::Provider {
                message: "geocoder offline".to_owned(),
            });
        }
        Ok(self.places.get(address).cloned())
    }
}

/// Reverse geocoder answering from a fixed table keyed by coordinate.
#[derive(Debug, Default)]
pub struct FixtureReverseGeocoder {
    names: HashMap<String, String>,
    failing: bool,
}

impl FixtureReverseGeocoder {
    /// Name the place at `at`.
    #[must_use]
    pub fn with_name(mut self, at: LatLng, name: &str) -> Self {
        self.names.insert(at.key_fragment(), name.to_owned());
        self
    }

    /// Reverse geocoder whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            names: HashMap::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl ReverseGeocoder for FixtureReverseGeocoder {
    async fn reverse(&self, at: LatLng) -> Result<String, GeocodeError> {
        if self.failing {
            return Err(GeocodeError::Provider {
                message: "reverse geocoder offline".to_owned(),
            });
        }
        Ok(self.names.get(&at.key_fragment()).cloned().unwrap_or_default())
    }
}

/// A single alternative that follows `points` in straight lines at 60 km/h.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "fixture distances and durations are derived from geometry"
)]
pub fn straight_alternative(points: &[LatLng]) -> RoutingAlternative {
    let distance_m: f64 = points
        .windows(2)
        .filter_map(|pair| match pair {
            [a, b] => Some(haversine_m(*a, *b)),
            _ => None,
        })
        .sum();
    let mut steps = Vec::new();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        steps.push(Maneuver {
            kind: ManeuverKind::Depart,
            modifier: Modifier::None,
            street_name: String::new(),
            location: *first,
        });
        steps.push(Maneuver {
            kind: ManeuverKind::Arrive,
            modifier: Modifier::None,
            street_name: String::new(),
            location: *last,
        });
    }
    RoutingAlternative {
        distance_m,
        duration_s: distance_m / (60_000.0 / 3_600.0),
        geometry: polyline::encode(points),
        steps,
    }
}

/// Routing engine that draws straight lines unless told otherwise.
///
/// Every call is recorded so tests can check the coordinate path.
#[derive(Debug, Default)]
pub struct StubRoutingEngine {
    overrides: HashMap<Profile, Result<Vec<RoutingAlternative>, RoutingError>>,
    simple_failure: Option<RoutingError>,
    requests: Mutex<Vec<(Profile, Vec<LatLng>)>>,
}

impl StubRoutingEngine {
    /// Engine answering every profile with one straight-line alternative.
    #[must_use]
    pub fn straight_line() -> Self {
        Self::default()
    }

    /// Answer `profile` with `alternatives`.
    #[must_use]
    pub fn with_alternatives(
        mut self,
        profile: Profile,
        alternatives: Vec<RoutingAlternative>,
    ) -> Self {
        self.overrides.insert(profile, Ok(alternatives));
        self
    }

    /// Fail `profile` with `error`.
    #[must_use]
    pub fn failing(mut self, profile: Profile, error: RoutingError) -> Self {
        self.overrides.insert(profile, Err(error));
        self
    }

    /// Answer `profile` with no alternatives.
    #[must_use]
    pub fn empty(self, profile: Profile) -> Self {
        self.with_alternatives(profile, Vec::new())
    }

    /// Fail simple-route calls with `error`.
    #[must_use]
    pub fn failing_simple(mut self, error: RoutingError) -> Self {
        self.simple_failure = Some(error);
        self
    }

    /// Every profile request received, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<(Profile, Vec<LatLng>)> {
        guard(&self.requests).clone()
    }
}

#[async_trait]
impl RoutingEngine for StubRoutingEngine {
    async fn route(
        &self,
        profile: Profile,
        path: &[LatLng],
    ) -> Result<Vec<RoutingAlternative>, RoutingError> {
        guard(&self.requests).push((profile, path.to_vec()));
        if path.len() < 2 {
            return Err(RoutingError::TooFewPoints { count: path.len() });
        }
        match self.overrides.get(&profile) {
            Some(answer) => answer.clone(),
            None => Ok(vec![straight_alternative(path)]),
        }
    }

    async fn simple_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<SimpleRoute, RoutingError> {
        if let Some(error) = &self.simple_failure {
            return Err(error.clone());
        }
        let line = straight_alternative(&[origin, destination]);
        Ok(SimpleRoute {
            distance_m: line.distance_m,
            duration_s: line.duration_s,
        })
    }
}
