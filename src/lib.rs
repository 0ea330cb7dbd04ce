//! Facade crate for the toll route planning engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite store
//! and the HTTP adapters behind feature flags.

#![forbid(unsafe_code)]

pub use tollroute_core::{
    Caller, FinalOutput, GeocodeError, GeocodingProvider, LatLng, PlanError, PlannerConfig,
    PlannerPorts, Profile, RemoteCache, RequestError, ReverseGeocoder, RouteOutput, RoutePlanner,
    RouteRequest, RouteRequestPayload, RouteStore, RoutingEngine, RoutingError, StoreError,
    TwoTierCache,
};

#[cfg(feature = "store-sqlite")]
pub use tollroute_core::SqliteRouteStore;

#[cfg(feature = "adapters")]
pub use tollroute_data::cache::RedisRestCache;
#[cfg(feature = "adapters")]
pub use tollroute_data::geocoding::{GoogleGeocoder, NominatimReverseGeocoder};
#[cfg(feature = "adapters")]
pub use tollroute_data::routing::OsrmRoutingEngine;
#[cfg(feature = "adapters")]
pub use tollroute_http::{AppState, router, serve};
