//! SQLite-backed [`RouteStore`].

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use geo::Rect;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::geometry::{Direction, LatLng};
use crate::poi::{FreightLoadRow, FuelStation, Toll, TollTag, WeighStation};

use super::{
    FavoriteRoute, HistoryKey, NewFavorite, PoiSeed, PublicQuota, QuotaDecision, RouteStore,
    SavedRoute, StoreError, decide_quota,
};

/// Bootstrap schema. Every statement is idempotent.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tolls (
    id INTEGER PRIMARY KEY,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    concession TEXT NOT NULL DEFAULT '',
    road TEXT NOT NULL DEFAULT '',
    uf TEXT NOT NULL DEFAULT '',
    sentido TEXT NOT NULL DEFAULT '',
    tariff REAL NOT NULL DEFAULT 0,
    free_flow INTEGER NOT NULL DEFAULT 0,
    pay_free_flow TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS toll_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    dealership_accepts TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS balanca (
    id INTEGER PRIMARY KEY,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    concession TEXT NOT NULL DEFAULT '',
    road TEXT NOT NULL DEFAULT '',
    km TEXT NOT NULL DEFAULT '',
    sentido TEXT NOT NULL DEFAULT '',
    uf TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS gas_stations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL DEFAULT '',
    address_name TEXT NOT NULL DEFAULT '',
    municipio TEXT NOT NULL DEFAULT '',
    latitude REAL NOT NULL,
    longitude REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS gas_stations_position ON gas_stations (latitude, longitude);
CREATE TABLE IF NOT EXISTS freight_load (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    type_of_load TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    two_axes TEXT NOT NULL DEFAULT '0',
    three_axes TEXT NOT NULL DEFAULT '0',
    four_axes TEXT NOT NULL DEFAULT '0',
    five_axes TEXT NOT NULL DEFAULT '0',
    six_axes TEXT NOT NULL DEFAULT '0',
    seven_axes TEXT NOT NULL DEFAULT '0',
    nine_axes TEXT NOT NULL DEFAULT '0'
);
CREATE TABLE IF NOT EXISTS route_hist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    waypoints TEXT NOT NULL DEFAULT '',
    response TEXT NOT NULL,
    is_public INTEGER NOT NULL,
    number_request INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, origin, destination, waypoints, is_public)
);
CREATE TABLE IF NOT EXISTS saved_routes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    waypoints TEXT NOT NULL DEFAULT '',
    request TEXT NOT NULL,
    response TEXT NOT NULL,
    expired_at TEXT NOT NULL,
    UNIQUE (origin, destination, waypoints)
);
CREATE TABLE IF NOT EXISTS favorite_route (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    waypoints TEXT NOT NULL DEFAULT '',
    response TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS token_hist (
    id INTEGER PRIMARY KEY,
    ip TEXT NOT NULL DEFAULT '',
    number_request INTEGER NOT NULL DEFAULT 0,
    expired_at TEXT NOT NULL
);
";

/// Route store backed by a single SQLite connection.
pub struct SqliteRouteStore {
    connection: Mutex<Connection>,
}

impl fmt::Debug for SqliteRouteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRouteStore").finish_non_exhaustive()
    }
}

impl SqliteRouteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file cannot be opened and
    /// [`StoreError::Database`] when the schema cannot be applied.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let database_path = path.as_ref();
        let connection = Connection::open(database_path).map_err(|source| StoreError::Open {
            path: database_path.to_path_buf(),
            source,
        })?;
        Self::with_connection(connection)
    }

    /// In-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert POI rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when any insert fails; nothing is
    /// written in that case.
    pub fn seed(&self, seed: &PoiSeed) -> Result<(), StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;
        for toll in &seed.tolls {
            tx.execute(
                "INSERT INTO tolls (id, latitude, longitude, name, concession, road, uf, sentido, tariff, free_flow, pay_free_flow)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    toll.id,
                    toll.location.lat,
                    toll.location.lng,
                    toll.name,
                    toll.concession,
                    toll.road,
                    toll.uf,
                    sentido(toll.direction),
                    toll.tariff,
                    toll.free_flow,
                    toll.pay_free_flow,
                ],
            )?;
        }
        for tag in &seed.toll_tags {
            tx.execute(
                "INSERT INTO toll_tags (name, dealership_accepts) VALUES (?1, ?2)",
                params![tag.name, tag.dealership_accepts],
            )?;
        }
        for station in &seed.weigh_stations {
            tx.execute(
                "INSERT INTO balanca (id, latitude, longitude, name, concession, road, km, sentido, uf)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    station.id,
                    station.location.lat,
                    station.location.lng,
                    station.name,
                    station.concession,
                    station.road,
                    station.km,
                    sentido(station.direction),
                    station.uf,
                ],
            )?;
        }
        for station in &seed.fuel_stations {
            tx.execute(
                "INSERT INTO gas_stations (name, address_name, municipio, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    station.name,
                    station.address,
                    station.municipality,
                    station.location.lat,
                    station.location.lng,
                ],
            )?;
        }
        for row in &seed.freight_loads {
            tx.execute(
                "INSERT INTO freight_load (name, type_of_load, description, two_axes, three_axes, four_axes, five_axes, six_axes, seven_axes, nine_axes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    row.name,
                    row.type_of_load,
                    row.description,
                    row.two_axes,
                    row.three_axes,
                    row.four_axes,
                    row.five_axes,
                    row.six_axes,
                    row.seven_axes,
                    row.nine_axes,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

const fn sentido(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "Crescente",
        Direction::Descending => "Decrescente",
        Direction::Both => "",
    }
}

fn toll_from_row(row: &Row<'_>) -> rusqlite::Result<Toll> {
    let raw_direction: String = row.get(7)?;
    Ok(Toll {
        id: row.get(0)?,
        location: LatLng::new(row.get(1)?, row.get(2)?),
        name: row.get(3)?,
        concession: row.get(4)?,
        road: row.get(5)?,
        uf: row.get(6)?,
        direction: Direction::from_sentido(&raw_direction),
        tariff: row.get(8)?,
        free_flow: row.get(9)?,
        pay_free_flow: row.get(10)?,
    })
}

fn weigh_station_from_row(row: &Row<'_>) -> rusqlite::Result<WeighStation> {
    let raw_direction: String = row.get(7)?;
    Ok(WeighStation {
        id: row.get(0)?,
        location: LatLng::new(row.get(1)?, row.get(2)?),
        name: row.get(3)?,
        concession: row.get(4)?,
        road: row.get(5)?,
        km: row.get(6)?,
        direction: Direction::from_sentido(&raw_direction),
        uf: row.get(8)?,
    })
}

fn favorite_from_row(row: &Row<'_>) -> rusqlite::Result<FavoriteRoute> {
    Ok(FavoriteRoute {
        id: row.get(0)?,
        user_id: row.get(1)?,
        origin: row.get(2)?,
        destination: row.get(3)?,
        waypoints_key: row.get(4)?,
        response_blob: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn quota_from_row(row: &Row<'_>) -> rusqlite::Result<PublicQuota> {
    Ok(PublicQuota {
        id: row.get(0)?,
        ip: row.get(1)?,
        number_request: row.get(2)?,
        expired_at: row.get(3)?,
    })
}

fn read_quota(connection: &Connection, token_id: i64) -> rusqlite::Result<Option<PublicQuota>> {
    connection
        .query_row(
            "SELECT id, ip, number_request, expired_at FROM token_hist WHERE id = ?1",
            params![token_id],
            quota_from_row,
        )
        .optional()
}

impl RouteStore for SqliteRouteStore {
    fn get_tolls(&self) -> Result<Vec<Toll>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT id, latitude, longitude, name, concession, road, uf, sentido, tariff, free_flow, pay_free_flow
             FROM tolls ORDER BY id",
        )?;
        let tolls = statement
            .query_map([], toll_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tolls)
    }

    fn get_toll_tags(&self) -> Result<Vec<TollTag>, StoreError> {
        let connection = self.lock()?;
        let mut statement =
            connection.prepare("SELECT name, dealership_accepts FROM toll_tags ORDER BY id")?;
        let tags = statement
            .query_map([], |row| {
                Ok(TollTag {
                    name: row.get(0)?,
                    dealership_accepts: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn get_balanca(&self) -> Result<Vec<WeighStation>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT id, latitude, longitude, name, concession, road, km, sentido, uf
             FROM balanca ORDER BY id",
        )?;
        let stations = statement
            .query_map([], weigh_station_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stations)
    }

    fn get_gas_stations_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<FuelStation>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT name, address_name, municipio, latitude, longitude FROM gas_stations
             WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4
             ORDER BY id",
        )?;
        let (min, max) = (bbox.min(), bbox.max());
        let stations = statement
            .query_map(params![min.y, max.y, min.x, max.x], |row| {
                Ok(FuelStation {
                    name: row.get(0)?,
                    address: row.get(1)?,
                    municipality: row.get(2)?,
                    location: LatLng::new(row.get(3)?, row.get(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stations)
    }

    fn get_freight_loads(&self) -> Result<Vec<FreightLoadRow>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT name, type_of_load, description, two_axes, three_axes, four_axes, five_axes, six_axes, seven_axes, nine_axes
             FROM freight_load ORDER BY id",
        )?;
        let rows = statement
            .query_map([], |row| {
                Ok(FreightLoadRow {
                    name: row.get(0)?,
                    type_of_load: row.get(1)?,
                    description: row.get(2)?,
                    two_axes: row.get(3)?,
                    three_axes: row.get(4)?,
                    four_axes: row.get(5)?,
                    five_axes: row.get(6)?,
                    six_axes: row.get(7)?,
                    seven_axes: row.get(8)?,
                    nine_axes: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert_route_hist(
        &self,
        key: &HistoryKey,
        response_blob: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let connection = self.lock()?;
        let id = connection.query_row(
            "INSERT INTO route_hist (user_id, origin, destination, waypoints, response, is_public, number_request, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
             ON CONFLICT (user_id, origin, destination, waypoints, is_public)
             DO UPDATE SET number_request = route_hist.number_request + 1
             RETURNING id",
            params![
                key.user_id,
                key.origin,
                key.destination,
                key.waypoints_key,
                response_blob,
                key.is_public,
                now,
            ],
            |row| row.get(0),
        )?;
        debug!("route history {id} recorded for user {}", key.user_id);
        Ok(id)
    }

    fn insert_saved_route(&self, route: &SavedRoute) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        let inserted = connection.execute(
            "INSERT INTO saved_routes (origin, destination, waypoints, request, response, expired_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (origin, destination, waypoints) DO NOTHING",
            params![
                route.origin,
                route.destination,
                route.waypoints_key,
                route.request_blob,
                route.response_blob,
                route.expired_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn insert_favorite(
        &self,
        favorite: &NewFavorite,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO favorite_route (user_id, origin, destination, waypoints, response, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                favorite.user_id,
                favorite.origin,
                favorite.destination,
                favorite.waypoints_key,
                favorite.response_blob,
                now,
            ],
        )?;
        Ok(connection.last_insert_rowid())
    }

    fn list_favorites(&self, user_id: i64) -> Result<Vec<FavoriteRoute>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT id, user_id, origin, destination, waypoints, response, created_at
             FROM favorite_route WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let favorites = statement
            .query_map(params![user_id], favorite_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    fn remove_favorite(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        let removed = connection.execute(
            "DELETE FROM favorite_route WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(removed > 0)
    }

    fn get_public_quota(&self, token_id: i64) -> Result<Option<PublicQuota>, StoreError> {
        let connection = self.lock()?;
        Ok(read_quota(&connection, token_id)?)
    }

    fn bump_public_quota(
        &self,
        token_id: i64,
        max: u32,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;
        let current = read_quota(&tx, token_id)?;
        let (decision, updated) = decide_quota(current, token_id, max, now);
        if let Some(quota) = updated {
            tx.execute(
                "INSERT INTO token_hist (id, ip, number_request, expired_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (id) DO UPDATE SET number_request = excluded.number_request, expired_at = excluded.expired_at",
                params![quota.id, quota.ip, quota.number_request, quota.expired_at],
            )?;
        }
        tx.commit()?;
        Ok(decision)
    }
}
