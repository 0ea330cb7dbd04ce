//! Core domain of the toll route planner.
//!
//! Requests name an origin, a destination and optional stops. The planner
//! geocodes them, asks a routing engine for fastest, toll-avoiding and
//! motorway-avoiding alternatives, then enriches every alternative with the
//! toll plazas, weigh stations and fuel stations along it, Portuguese
//! turn-by-turn instructions, cost figures and the freight tariff table.
//!
//! External services sit behind traits so adapters can be swapped:
//! [`GeocodingProvider`], [`ReverseGeocoder`], [`RoutingEngine`],
//! [`RemoteCache`] and [`RouteStore`].

pub mod assets;
pub mod cache;
pub mod costs;
pub mod format;
pub mod freight;
pub mod geocode;
pub mod geometry;
pub mod instructions;
pub mod matcher;
pub mod output;
pub mod planner;
pub mod poi;
pub mod polyline;
pub mod request;
pub mod routing;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{NoRemoteCache, RemoteCache, TwoTierCache};
pub use geocode::{GeocodeError, GeocodeResult, GeocodingProvider, ReverseGeocoder};
pub use geometry::LatLng;
pub use output::{FinalOutput, RouteOutput, SimpleRouteOutput};
pub use planner::{Caller, PlanError, PlannerConfig, PlannerPorts, RoutePlanner};
pub use request::{
    CoordinateRouteRequest, CoordinateRouteRequestPayload, RequestError, RouteRequest,
    RouteRequestPayload, SimpleRouteRequest,
};
pub use routing::{Profile, RoutingAlternative, RoutingEngine, RoutingError};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteRouteStore;
pub use store::{RouteStore, StoreError};
