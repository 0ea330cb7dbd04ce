//! Routing-engine port and the three-profile fan-out.

use std::fmt;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::LatLng;
use crate::instructions::Maneuver;

/// Routing profile requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Quickest path.
    Fastest,
    /// Avoid tolls.
    Cheapest,
    /// Avoid motorways.
    Efficient,
}

impl Profile {
    /// Every profile in output order.
    pub const ALL: [Self; 3] = [Self::Fastest, Self::Cheapest, Self::Efficient];

    /// Label written to `summary.route_type`. The fastest label keeps the
    /// spelling existing clients match on.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fastest => "fatest",
            Self::Cheapest => "cheapest",
            Self::Efficient => "efficient",
        }
    }

    /// Query string sent to the routing engine.
    #[must_use]
    pub const fn query(self) -> &'static str {
        match self {
            Self::Fastest => {
                "alternatives=3&steps=true&overview=full&continue_straight=false"
            }
            Self::Cheapest => "alternatives=3&steps=true&overview=full&exclude=toll",
            Self::Efficient => "alternatives=3&steps=true&overview=full&exclude=motorway",
        }
    }

    /// Lowercase profile name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Cheapest => "cheapest",
            Self::Efficient => "efficient",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string for a single overview-only route.
pub const SIMPLE_ROUTE_QUERY: &str = "alternatives=false&steps=false&overview=full";

/// One alternative returned by the routing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingAlternative {
    /// Length in metres.
    pub distance_m: f64,
    /// Duration in seconds.
    pub duration_s: f64,
    /// Encoded polyline.
    pub geometry: String,
    /// Steps of the first leg.
    pub steps: Vec<Maneuver>,
}

/// Distance and duration of a simple route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleRoute {
    /// Length in metres.
    pub distance_m: f64,
    /// Duration in seconds.
    pub duration_s: f64,
}

/// Errors raised by a routing engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Fewer than two coordinates were supplied.
    #[error("routing needs at least two coordinates, got {count}")]
    TooFewPoints {
        /// Coordinates supplied.
        count: usize,
    },
    /// The request timed out.
    #[error("routing engine request timed out")]
    Timeout,
    /// The engine could not be reached.
    #[error("routing engine unreachable: {message}")]
    Network {
        /// Transport failure description.
        message: String,
    },
    /// The engine answered with an HTTP error.
    #[error("routing engine returned HTTP {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },
    /// The engine answered with a non-`Ok` code.
    #[error("routing engine answered {code}: {message}")]
    Rejected {
        /// Engine status code, e.g. `NoRoute`.
        code: String,
        /// Engine message, possibly empty.
        message: String,
    },
    /// The engine answered `Ok` without routes.
    #[error("routing engine returned no routes")]
    NoRoutes,
    /// The body could not be decoded.
    #[error("routing engine response malformed: {message}")]
    Decode {
        /// Parser message.
        message: String,
    },
}

/// Road routing service.
#[async_trait]
pub trait RoutingEngine: Send + Sync {
    /// Alternatives for `path` under `profile`.
    async fn route(
        &self,
        profile: Profile,
        path: &[LatLng],
    ) -> Result<Vec<RoutingAlternative>, RoutingError>;

    /// Overview-only route between two points.
    async fn simple_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<SimpleRoute, RoutingError>;
}

/// Coordinate path in the engine's `lng,lat;lng,lat` form.
///
/// # Examples
///
/// ```
/// use tollroute_core::geometry::LatLng;
/// use tollroute_core::routing::coordinate_path;
///
/// let path = coordinate_path(&[LatLng::new(-15.6, -56.1), LatLng::new(-23.55, -46.63)]);
/// assert_eq!(path, "-56.1,-15.6;-46.63,-23.55");
/// ```
#[must_use]
pub fn coordinate_path(points: &[LatLng]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.lng, p.lat))
        .collect::<Vec<_>>()
        .join(";")
}

/// A profile that failed during the fan-out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("routing failed for profile {profile}: {source}")]
pub struct FanOutError {
    /// Profile that failed first.
    pub profile: Profile,
    /// Underlying failure.
    #[source]
    pub source: RoutingError,
}

/// Alternatives for every profile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileRoutes {
    /// Fastest alternatives.
    pub fastest: Vec<RoutingAlternative>,
    /// Toll-avoiding alternatives.
    pub cheapest: Vec<RoutingAlternative>,
    /// Motorway-avoiding alternatives.
    pub efficient: Vec<RoutingAlternative>,
}

impl ProfileRoutes {
    /// Alternatives for `profile`.
    #[must_use]
    pub fn get(&self, profile: Profile) -> &[RoutingAlternative] {
        match profile {
            Profile::Fastest => &self.fastest,
            Profile::Cheapest => &self.cheapest,
            Profile::Efficient => &self.efficient,
        }
    }
}

async fn fetch(
    engine: &dyn RoutingEngine,
    profile: Profile,
    path: &[LatLng],
) -> Result<Vec<RoutingAlternative>, FanOutError> {
    let routes = engine
        .route(profile, path)
        .await
        .map_err(|source| FanOutError { profile, source })?;
    if routes.is_empty() {
        return Err(FanOutError {
            profile,
            source: RoutingError::NoRoutes,
        });
    }
    info!("profile {profile}: {} alternatives", routes.len());
    Ok(routes)
}

/// Request all three profiles concurrently.
///
/// The first failure wins and the remaining requests are dropped.
///
/// # Errors
///
/// Returns [`FanOutError`] naming the profile that failed, including a
/// profile that returned no routes.
pub async fn fan_out(
    engine: &dyn RoutingEngine,
    path: &[LatLng],
) -> Result<ProfileRoutes, FanOutError> {
    if path.len() < 2 {
        return Err(FanOutError {
            profile: Profile::Fastest,
            source: RoutingError::TooFewPoints { count: path.len() },
        });
    }
    let (fastest, cheapest, efficient) = tokio::try_join!(
        fetch(engine, Profile::Fastest, path),
        fetch(engine, Profile::Cheapest, path),
        fetch(engine, Profile::Efficient, path),
    )?;
    Ok(ProfileRoutes {
        fastest,
        cheapest,
        efficient,
    })
}
