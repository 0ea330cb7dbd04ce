//! Persistence port for POI universes, route history, favourites and the
//! public-token quota.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use geo::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poi::{FreightLoadRow, FuelStation, Toll, TollTag, WeighStation};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteRouteStore;

/// How long a saved route stays valid.
#[must_use]
pub const fn saved_route_lifetime() -> ChronoDuration {
    ChronoDuration::days(30)
}

/// How long a quota window lasts.
#[must_use]
pub const fn quota_window() -> ChronoDuration {
    ChronoDuration::days(1)
}

/// Errors raised by a [`RouteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open SQLite database at {path}: {source}")]
    Open {
        /// Location of the database.
        path: std::path::PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Generic SQLite failure.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("route store lock poisoned")]
    Poisoned,
}

/// Identity of a route-history row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryKey {
    /// Owner: user id for private requests, token id for public ones.
    pub user_id: i64,
    /// Origin as requested.
    pub origin: String,
    /// Destination as requested.
    pub destination: String,
    /// Waypoints joined with commas.
    pub waypoints_key: String,
    /// Whether the request was public.
    pub is_public: bool,
}

/// A stored route-history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHistory {
    /// Row identifier.
    pub id: i64,
    /// Unique key.
    pub key: HistoryKey,
    /// Serialised response of the first request.
    pub response_blob: String,
    /// How many times the key was requested.
    pub number_request: i64,
    /// First request time.
    pub created_at: DateTime<Utc>,
}

/// A route kept for later reuse, unique on origin, destination and
/// waypoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRoute {
    /// Origin as requested.
    pub origin: String,
    /// Destination as requested.
    pub destination: String,
    /// Waypoints joined with commas.
    pub waypoints_key: String,
    /// Serialised request.
    pub request_blob: String,
    /// Serialised response.
    pub response_blob: String,
    /// Expiry time.
    pub expired_at: DateTime<Utc>,
}

/// A favourite to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFavorite {
    /// Owner.
    pub user_id: i64,
    /// Origin as requested.
    pub origin: String,
    /// Destination as requested.
    pub destination: String,
    /// Waypoints joined with commas.
    pub waypoints_key: String,
    /// Serialised response.
    pub response_blob: String,
}

/// A stored favourite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRoute {
    /// Row identifier.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Origin as requested.
    pub origin: String,
    /// Destination as requested.
    pub destination: String,
    /// Waypoints joined with commas.
    pub waypoints_key: String,
    /// Serialised response.
    pub response_blob: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Usage record of a public token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicQuota {
    /// Token identifier.
    pub id: i64,
    /// Address the token was issued to.
    pub ip: String,
    /// Requests made in the current window.
    pub number_request: i64,
    /// End of the current window.
    pub expired_at: DateTime<Utc>,
}

/// Result of a quota bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The request fits; the count now stands at `used`.
    Granted {
        /// Requests used in the window including this one.
        used: i64,
    },
    /// The token is exhausted; nothing was incremented.
    Exhausted {
        /// Requests already used in the window.
        used: i64,
    },
}

/// Rows used to populate POI tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiSeed {
    /// Toll plazas.
    #[serde(default)]
    pub tolls: Vec<Toll>,
    /// Tag brands.
    #[serde(default)]
    pub toll_tags: Vec<TollTag>,
    /// Weigh stations.
    #[serde(default)]
    pub weigh_stations: Vec<WeighStation>,
    /// Fuel stations.
    #[serde(default)]
    pub fuel_stations: Vec<FuelStation>,
    /// Freight tariff rows.
    #[serde(default)]
    pub freight_loads: Vec<FreightLoadRow>,
}

/// Apply a quota bump to the current state of a token.
///
/// Expired windows restart at zero with a fresh one-day expiry. Returns the
/// decision and the row to persist when the request is granted.
#[must_use]
pub fn decide_quota(
    current: Option<PublicQuota>,
    token_id: i64,
    max: u32,
    now: DateTime<Utc>,
) -> (QuotaDecision, Option<PublicQuota>) {
    let mut quota = current.unwrap_or_else(|| PublicQuota {
        id: token_id,
        ip: String::new(),
        number_request: 0,
        expired_at: now + quota_window(),
    });
    if quota.expired_at <= now {
        quota.number_request = 0;
        quota.expired_at = now + quota_window();
    }
    if quota.number_request >= i64::from(max) {
        return (
            QuotaDecision::Exhausted {
                used: quota.number_request,
            },
            None,
        );
    }
    quota.number_request += 1;
    (
        QuotaDecision::Granted {
            used: quota.number_request,
        },
        Some(quota),
    )
}

/// Capability set the planner needs from persistence.
///
/// Implementations block; async callers should run them on the blocking
/// pool.
pub trait RouteStore: Send + Sync {
    /// Every toll plaza.
    fn get_tolls(&self) -> Result<Vec<Toll>, StoreError>;

    /// Every tag brand.
    fn get_toll_tags(&self) -> Result<Vec<TollTag>, StoreError>;

    /// Every weigh station.
    fn get_balanca(&self) -> Result<Vec<WeighStation>, StoreError>;

    /// Fuel stations inside `bbox` (x = longitude, y = latitude).
    fn get_gas_stations_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<FuelStation>, StoreError>;

    /// Every freight tariff row.
    fn get_freight_loads(&self) -> Result<Vec<FreightLoadRow>, StoreError>;

    /// Insert a history row with `number_request = 1`, or bump the count of
    /// an existing one leaving its response untouched. Returns the row id.
    fn upsert_route_hist(
        &self,
        key: &HistoryKey,
        response_blob: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Insert a saved route; returns `false` when the key already exists.
    fn insert_saved_route(&self, route: &SavedRoute) -> Result<bool, StoreError>;

    /// Insert a favourite and return its id.
    fn insert_favorite(
        &self,
        favorite: &NewFavorite,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Favourites of `user_id`, newest first.
    fn list_favorites(&self, user_id: i64) -> Result<Vec<FavoriteRoute>, StoreError>;

    /// Remove favourite `id` if owned by `user_id`; returns whether a row
    /// was removed.
    fn remove_favorite(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;

    /// Current quota row of a public token.
    fn get_public_quota(&self, token_id: i64) -> Result<Option<PublicQuota>, StoreError>;

    /// Check and increment a public token's quota atomically.
    fn bump_public_quota(
        &self,
        token_id: i64,
        max: u32,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, StoreError>;
}
