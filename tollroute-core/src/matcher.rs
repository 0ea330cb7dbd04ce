//! Corridor matching of points of interest against a decoded route.
//!
//! Candidates are pre-selected with an R\*-tree queried once per segment
//! using the segment's bounds padded by the corridor width. The exact
//! perpendicular-distance test then decides membership.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use geo::Rect;
use log::debug;
use rstar::{AABB, RTree, RTreeObject};

use crate::geometry::{
    self, LatLng, haversine_m, min_distance_to_polyline_m, route_direction, segment_envelope,
};
use crate::poi::{FuelStation, Located, Toll, WeighStation};

/// Padding in degrees around a route when querying fuel stations.
pub const FUEL_STATION_PAD_DEG: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    point: [f64; 2],
}

impl RTreeObject for Slot {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

/// Immutable spatial index over a POI universe.
pub struct PoiIndex<T> {
    items: Vec<T>,
    tree: RTree<Slot>,
}

impl<T> fmt::Debug for PoiIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoiIndex")
            .field("entries", &self.items.len())
            .finish_non_exhaustive()
    }
}

impl<T: Located> PoiIndex<T> {
    /// Bulk-load an index over `items`.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        let slots = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let at = item.location();
                Slot {
                    index,
                    point: [at.lng, at.lat],
                }
            })
            .collect();
        Self {
            items,
            tree: RTree::bulk_load(slots),
        }
    }

    /// Number of indexed items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the index holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items within `corridor_m` of the route that serve its direction, in
    /// index order.
    ///
    /// Routes with fewer than two points match nothing.
    #[must_use]
    pub fn along(&self, points: &[LatLng], corridor_m: f64) -> Vec<&T> {
        let direction = route_direction(points);
        self.candidates(points, corridor_m)
            .into_iter()
            .filter_map(|index| self.items.get(index))
            .filter(|item| within_corridor(item.location(), points, corridor_m))
            .filter(|item| {
                let serves = item.direction().serves(direction);
                if !serves {
                    debug!(
                        "excluding POI at {:?}: serves {:?}, route is {:?}",
                        item.location(),
                        item.direction(),
                        direction
                    );
                }
                serves
            })
            .collect()
    }

    fn candidates(&self, points: &[LatLng], corridor_m: f64) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        for pair in points.windows(2) {
            if let [v, w] = pair {
                let (min, max) = segment_envelope(*v, *w, corridor_m);
                let envelope = AABB::from_corners(min, max);
                found.extend(
                    self.tree
                        .locate_in_envelope(&envelope)
                        .map(|slot| slot.index),
                );
            }
        }
        found
    }
}

fn within_corridor(location: LatLng, points: &[LatLng], corridor_m: f64) -> bool {
    min_distance_to_polyline_m(location, points).is_some_and(|d| d <= corridor_m)
}

/// Tolls on the route, deduplicated by id and ordered by distance from the
/// route start.
#[must_use]
pub fn match_tolls(index: &PoiIndex<Toll>, points: &[LatLng], corridor_m: f64) -> Vec<Toll> {
    let Some(start) = points.first().copied() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut tolls: Vec<Toll> = index
        .along(points, corridor_m)
        .into_iter()
        .filter(|toll| seen.insert(toll.id))
        .cloned()
        .collect();
    tolls.sort_by(|a, b| {
        haversine_m(start, a.location).total_cmp(&haversine_m(start, b.location))
    });
    tolls
}

/// Weigh stations on the route.
#[must_use]
pub fn match_weigh_stations(
    index: &PoiIndex<WeighStation>,
    points: &[LatLng],
    corridor_m: f64,
) -> Vec<WeighStation> {
    index
        .along(points, corridor_m)
        .into_iter()
        .cloned()
        .collect()
}

/// Box to query fuel-station candidates for a route.
#[must_use]
pub fn fuel_station_query_box(points: &[LatLng]) -> Option<Rect<f64>> {
    geometry::bounding_box(points, FUEL_STATION_PAD_DEG)
}

/// Fuel stations from `candidates` that lie in the corridor.
///
/// Fuel stations serve both carriageways.
#[must_use]
pub fn match_fuel_stations(
    candidates: Vec<FuelStation>,
    points: &[LatLng],
    corridor_m: f64,
) -> Vec<FuelStation> {
    candidates
        .into_iter()
        .filter(|station| within_corridor(station.location, points, corridor_m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Direction;
    use rstest::{fixture, rstest};

    fn toll(id: i64, lat: f64, lng: f64, direction: Direction) -> Toll {
        Toll {
            id,
            location: LatLng::new(lat, lng),
            name: format!("Praça {id}"),
            concession: "ECOVIAS".to_owned(),
            road: "SP-150".to_owned(),
            uf: "SP".to_owned(),
            direction,
            tariff: 10.0,
            free_flow: false,
            pay_free_flow: String::new(),
        }
    }

    /// A northbound route along the meridian from -24 to -23.
    #[fixture]
    fn northbound() -> Vec<LatLng> {
        vec![
            LatLng::new(-24.0, -46.5),
            LatLng::new(-23.5, -46.5),
            LatLng::new(-23.0, -46.5),
        ]
    }

    #[rstest]
    fn matches_within_corridor_only(northbound: Vec<LatLng>) {
        let index = PoiIndex::new(vec![
            toll(1, -23.7, -46.5003, Direction::Both),
            toll(2, -23.7, -46.5010, Direction::Both),
        ]);
        let ids: Vec<_> = match_tolls(&index, &northbound, 50.0)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[rstest]
    fn respects_direction(northbound: Vec<LatLng>) {
        let index = PoiIndex::new(vec![
            toll(1, -23.6, -46.5, Direction::Ascending),
            toll(2, -23.4, -46.5, Direction::Descending),
        ]);
        let ids: Vec<_> = match_tolls(&index, &northbound, 50.0)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[rstest]
    fn dedups_and_sorts_from_start(northbound: Vec<LatLng>) {
        let index = PoiIndex::new(vec![
            toll(3, -23.1, -46.5, Direction::Both),
            toll(4, -23.9, -46.5, Direction::Both),
            toll(3, -23.1, -46.5, Direction::Both),
        ]);
        let ids: Vec<_> = match_tolls(&index, &northbound, 50.0)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[rstest]
    fn single_point_route_matches_nothing() {
        let index = PoiIndex::new(vec![toll(1, 0.0, 0.0, Direction::Both)]);
        assert!(match_tolls(&index, &[LatLng::new(0.0, 0.0)], 50.0).is_empty());
    }

    #[rstest]
    fn fuel_stations_ignore_direction(northbound: Vec<LatLng>) {
        let near = FuelStation {
            name: "Posto A".to_owned(),
            address: "Rod. Anchieta".to_owned(),
            municipality: "São Bernardo".to_owned(),
            location: LatLng::new(-23.3, -46.5002),
        };
        let far = FuelStation {
            location: LatLng::new(-23.3, -46.52),
            ..near.clone()
        };
        let matched = match_fuel_stations(vec![near.clone(), far], &northbound, 50.0);
        assert_eq!(matched, vec![near]);
    }

    #[rstest]
    fn fuel_station_box_is_padded(northbound: Vec<LatLng>) {
        let rect = fuel_station_query_box(&northbound).expect("box");
        assert!((rect.min().y - (-24.05)).abs() < 1e-9);
        assert!((rect.max().x - (-46.45)).abs() < 1e-9);
    }
}
