//! Two-tier cache for geocodes and planned routes.
//!
//! Tier 1 is an in-process map shared by every request. Tier 2 is a remote
//! key-value store reached through [`RemoteCache`]. Reads try tier 1 first
//! and back-fill it on a tier-2 hit; writes go to both. The remote tier is
//! best effort: its failures are logged and read as misses.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::geometry::LatLng;
use crate::poi::Arrival;
use crate::request::VehicleType;

const SECONDS_PER_DAY: u64 = 86_400;

/// Lifetime of cached geocodes.
pub const GEOCODE_TTL: Duration = Duration::from_secs(30 * SECONDS_PER_DAY);
/// Lifetime of cached route responses.
pub const ROUTE_TTL: Duration = Duration::from_secs(10_000 * SECONDS_PER_DAY);

/// Errors raised by a remote cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The remote store could not be reached.
    #[error("remote cache unavailable: {message}")]
    Unavailable {
        /// Transport failure description.
        message: String,
    },
    /// The remote store answered with an error status.
    #[error("remote cache returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// The remote store's reply could not be understood.
    #[error("remote cache reply malformed: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
}

/// Remote key-value store with per-entry expiry.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// Fetch a value; `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Remote tier used when no store is configured: never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemoteCache;

#[async_trait]
impl RemoteCache for NoRemoteCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local tier. Expired entries are dropped when next read.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: RwLock<HashMap<String, LocalEntry>>,
}

impl LocalCache {
    /// Live value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = {
            let entries = self.entries.read().ok()?;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired && let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        None
    }

    /// Store `value` under `key` for `ttl`.
    pub fn set(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .unwrap_or_else(far_future);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key.to_owned(),
                LocalEntry {
                    value: value.to_owned(),
                    expires_at,
                },
            );
        }
    }

    /// Number of stored entries, live or not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether the tier holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn far_future() -> Instant {
    let now = Instant::now();
    now.checked_add(Duration::from_secs(100 * 365 * SECONDS_PER_DAY))
        .unwrap_or(now)
}

/// Write-through cache over a local and a remote tier.
pub struct TwoTierCache {
    local: LocalCache,
    remote: Arc<dyn RemoteCache>,
}

impl std::fmt::Debug for TwoTierCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoTierCache")
            .field("local_entries", &self.local.len())
            .finish_non_exhaustive()
    }
}

impl Default for TwoTierCache {
    fn default() -> Self {
        Self::local_only()
    }
}

impl TwoTierCache {
    /// Cache backed by `remote` as tier 2.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteCache>) -> Self {
        Self {
            local: LocalCache::default(),
            remote,
        }
    }

    /// Cache with no remote tier.
    #[must_use]
    pub fn local_only() -> Self {
        Self::new(Arc::new(NoRemoteCache))
    }

    /// The in-process tier.
    #[must_use]
    pub const fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Look up `key`, back-filling tier 1 for `ttl` on a tier-2 hit.
    pub async fn get(&self, key: &str, ttl: Duration) -> Option<String> {
        if let Some(value) = self.local.get(key) {
            return Some(value);
        }
        match self.remote.get(key).await {
            Ok(Some(value)) => {
                self.local.set(key, &value, ttl);
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("remote cache read for {key} failed: {err}");
                None
            }
        }
    }

    /// Store `value` in both tiers.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        self.local.set(key, value, ttl);
        if let Err(err) = self.remote.set(key, value, ttl).await {
            warn!("remote cache write for {key} failed: {err}");
        }
    }

    /// Look up and decode a JSON value; undecodable entries read as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let raw = self.get(key, ttl).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("discarding undecodable cache entry {key}: {err}");
                None
            }
        }
    }

    /// Encode and store a JSON value in both tiers.
    pub async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(err) => warn!("cannot encode cache entry {key}: {err}"),
        }
    }
}

/// Shared memo of toll arrival estimates keyed by origin label and toll id.
#[derive(Debug, Default)]
pub struct EtaMemo {
    entries: RwLock<HashMap<(String, i64), Arrival>>,
}

impl EtaMemo {
    /// Cached estimate, or `compute` stored and returned.
    pub fn get_or_insert_with<F>(&self, origin: &str, toll_id: i64, compute: F) -> Arrival
    where
        F: FnOnce() -> Arrival,
    {
        let key = (origin.to_owned(), toll_id);
        if let Some(found) = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key).cloned())
        {
            return found;
        }
        let arrival = compute();
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, arrival.clone());
        }
        arrival
    }

    /// Number of memoised estimates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether nothing is memoised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key for a normalised address.
#[must_use]
pub fn geocode_key(normalised: &str) -> String {
    format!("geocode:{}", normalised.trim().to_lowercase())
}

/// Cache key for an address-based route request.
///
/// # Examples
///
/// ```
/// use tollroute_core::cache::route_key;
/// use tollroute_core::request::VehicleType;
///
/// let key = route_key("Cuiabá", "São Paulo", &[], 5, VehicleType::Truck);
/// assert_eq!(key, "route:cuiabá:são paulo::axles:5:type:truck");
/// ```
#[must_use]
pub fn route_key(
    origin: &str,
    destination: &str,
    waypoints: &[String],
    axles: u8,
    vehicle: VehicleType,
) -> String {
    format!(
        "route:{}:{}:{}:axles:{axles}:type:{}",
        origin.trim(),
        destination.trim(),
        waypoints.join(","),
        vehicle.as_str()
    )
    .to_lowercase()
}

/// Cache key for a coordinate-based route request.
#[must_use]
pub fn coordinate_route_key(
    origin: LatLng,
    destination: LatLng,
    waypoints: &[LatLng],
    axles: u8,
    vehicle: VehicleType,
) -> String {
    let stops: Vec<String> = waypoints.iter().map(|p| p.key_fragment()).collect();
    format!(
        "route:{:.6}:{:.6}:{:.6}:{:.6}:waypoints:{}:axles:{axles}:type:{}",
        origin.lat,
        origin.lng,
        destination.lat,
        destination.lng,
        stops.join(";"),
        vehicle.as_str()
    )
}
