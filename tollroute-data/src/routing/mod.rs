//! OSRM routing adapter.
//!
//! [`OsrmRoutingEngine`] implements [`tollroute_core::RoutingEngine`] over the
//! OSRM `route` service. The wire models live in [`osrm`].

pub mod osrm;
mod provider;

pub use provider::{DEFAULT_TIMEOUT, OsrmConfig, OsrmRoutingEngine};
