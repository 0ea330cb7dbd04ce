//! Planar and spherical helpers used to place points of interest on a route.
//!
//! Distances along the corridor use an equirectangular projection anchored at
//! the start of each segment. It is accurate enough for the tens of metres a
//! corridor spans and far cheaper than geodesic maths.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres used by [`haversine_m`].
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per degree of latitude in the equirectangular projection.
pub const METRES_PER_DEGREE: f64 = 111_320.0;

/// Default half-width of the corridor used to match POIs to a route.
pub const POI_CORRIDOR_M: f64 = 50.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Build a position from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the WGS84 range.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Format as `lat,lng` with six decimals, the form used in cache keys.
    #[must_use]
    pub fn key_fragment(self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }
}

impl From<LatLng> for Coord<f64> {
    fn from(value: LatLng) -> Self {
        Self {
            x: value.lng,
            y: value.lat,
        }
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(value: Coord<f64>) -> Self {
        Self {
            lat: value.y,
            lng: value.x,
        }
    }
}

/// Travel direction of a road segment or of a whole route.
///
/// Toll plazas and weigh stations are catalogued per carriageway. A route
/// heading north is treated as ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Increasing latitude (`Crescente`).
    Ascending,
    /// Decreasing latitude (`Decrescente`).
    Descending,
    /// Serves both carriageways.
    #[default]
    Both,
}

impl Direction {
    /// Parse the Portuguese `sentido` column stored alongside tolls.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollroute_core::geometry::Direction;
    ///
    /// assert_eq!(Direction::from_sentido("Crescente"), Direction::Ascending);
    /// assert_eq!(Direction::from_sentido(" decrescente "), Direction::Descending);
    /// assert_eq!(Direction::from_sentido("Ambos"), Direction::Both);
    /// ```
    #[must_use]
    pub fn from_sentido(raw: &str) -> Self {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("crescente") {
            Self::Ascending
        } else if value.eq_ignore_ascii_case("decrescente") {
            Self::Descending
        } else {
            Self::Both
        }
    }

    /// Whether a POI catalogued with this direction is reachable by a route
    /// travelling in `route`.
    #[must_use]
    pub fn serves(self, route: Self) -> bool {
        matches!(self, Self::Both) || self == route
    }
}

/// Great-circle distance between two positions in metres.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "haversine formula requires floating point maths"
)]
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Distance in metres from `p` to the segment `v`–`w`.
///
/// The projection is scaled at `v`'s latitude. The projection parameter is
/// clamped to the segment so points beyond either end measure to that end.
/// A degenerate segment measures to `v`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "projection onto a segment requires floating point maths"
)]
pub fn perpendicular_distance_m(p: LatLng, v: LatLng, w: LatLng) -> f64 {
    let lng_factor = METRES_PER_DEGREE * v.lat.to_radians().cos();
    let lat_factor = METRES_PER_DEGREE;

    let px = (p.lng - v.lng) * lng_factor;
    let py = (p.lat - v.lat) * lat_factor;
    let wx = (w.lng - v.lng) * lng_factor;
    let wy = (w.lat - v.lat) * lat_factor;

    let length_sq = wx.mul_add(wx, wy * wy);
    if length_sq == 0.0 {
        return px.hypot(py);
    }

    let t = (px.mul_add(wx, py * wy) / length_sq).clamp(0.0, 1.0);
    (px - t * wx).hypot(py - t * wy)
}

/// Minimum distance in metres from `p` to any segment of `points`.
///
/// Returns `None` when `points` holds fewer than two positions.
#[must_use]
pub fn min_distance_to_polyline_m(p: LatLng, points: &[LatLng]) -> Option<f64> {
    points
        .windows(2)
        .filter_map(|pair| match pair {
            [v, w] => Some(perpendicular_distance_m(p, *v, *w)),
            _ => None,
        })
        .min_by(f64::total_cmp)
}

/// Direction a route travels, judged from its end points.
///
/// Ascending iff the first latitude is strictly below the last; a single
/// point or an empty route counts as descending.
#[must_use]
pub fn route_direction(points: &[LatLng]) -> Direction {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if first.lat < last.lat => Direction::Ascending,
        _ => Direction::Descending,
    }
}

/// Bounding box of `points` grown by `pad_degrees` on every side.
///
/// Returns `None` for an empty slice.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "padding extents requires floating point maths"
)]
pub fn bounding_box(points: &[LatLng], pad_degrees: f64) -> Option<Rect<f64>> {
    let first = points.first()?;
    let (mut min, mut max) = (*first, *first);
    for point in points {
        min.lat = min.lat.min(point.lat);
        min.lng = min.lng.min(point.lng);
        max.lat = max.lat.max(point.lat);
        max.lng = max.lng.max(point.lng);
    }
    Some(Rect::new(
        Coord {
            x: min.lng - pad_degrees,
            y: min.lat - pad_degrees,
        },
        Coord {
            x: max.lng + pad_degrees,
            y: max.lat + pad_degrees,
        },
    ))
}

/// Bounds of the segment `v`–`w` grown by `corridor_m` metres, in degrees.
///
/// The longitude padding uses the cosine at `v` as the exact test does, and
/// is widened to a degree near the poles where the cosine collapses.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "metre to degree conversion requires floating point maths"
)]
pub fn segment_envelope(v: LatLng, w: LatLng, corridor_m: f64) -> ([f64; 2], [f64; 2]) {
    let lat_pad = corridor_m / METRES_PER_DEGREE;
    let cos = v.lat.to_radians().cos().abs();
    let lng_pad = if cos > 1e-6 {
        corridor_m / (METRES_PER_DEGREE * cos)
    } else {
        1.0
    };
    (
        [v.lng.min(w.lng) - lng_pad, v.lat.min(w.lat) - lat_pad],
        [v.lng.max(w.lng) + lng_pad, v.lat.max(w.lat) + lat_pad],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Crescente", Direction::Ascending)]
    #[case("CRESCENTE", Direction::Ascending)]
    #[case("Decrescente", Direction::Descending)]
    #[case("", Direction::Both)]
    #[case("Ambos", Direction::Both)]
    fn parses_sentido(#[case] raw: &str, #[case] expected: Direction) {
        assert_eq!(Direction::from_sentido(raw), expected);
    }

    #[rstest]
    #[case(Direction::Both, Direction::Ascending, true)]
    #[case(Direction::Ascending, Direction::Ascending, true)]
    #[case(Direction::Ascending, Direction::Descending, false)]
    #[case(Direction::Descending, Direction::Ascending, false)]
    fn direction_service(#[case] poi: Direction, #[case] route: Direction, #[case] ok: bool) {
        assert_eq!(poi.serves(route), ok);
    }

    #[rstest]
    fn haversine_one_degree_of_latitude() {
        let d = haversine_m(LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0));
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[rstest]
    fn haversine_is_zero_for_same_point() {
        let p = LatLng::new(-23.55, -46.63);
        assert!(haversine_m(p, p).abs() < f64::EPSILON);
    }

    #[rstest]
    fn perpendicular_distance_off_segment_middle() {
        let v = LatLng::new(0.0, 0.0);
        let w = LatLng::new(0.0, 1.0);
        let p = LatLng::new(0.0003, 0.5);
        let d = perpendicular_distance_m(p, v, w);
        assert!((d - 33.396).abs() < 0.01, "got {d}");
    }

    #[rstest]
    fn perpendicular_distance_clamps_beyond_end() {
        let v = LatLng::new(0.0, 0.0);
        let w = LatLng::new(0.0, 0.001);
        let p = LatLng::new(0.0, 0.002);
        let d = perpendicular_distance_m(p, v, w);
        assert!((d - 111.32).abs() < 0.01, "got {d}");
    }

    #[rstest]
    fn degenerate_segment_measures_to_start() {
        let v = LatLng::new(0.0, 0.0);
        let p = LatLng::new(0.001, 0.0);
        let d = perpendicular_distance_m(p, v, v);
        assert!((d - 111.32).abs() < 0.01, "got {d}");
    }

    #[rstest]
    fn polyline_distance_needs_two_points() {
        let p = LatLng::new(0.0, 0.0);
        assert!(min_distance_to_polyline_m(p, &[p]).is_none());
        assert!(min_distance_to_polyline_m(p, &[p, LatLng::new(0.0, 1.0)]).is_some());
    }

    #[rstest]
    #[case(&[LatLng::new(-30.0, 0.0), LatLng::new(-20.0, 0.0)], Direction::Ascending)]
    #[case(&[LatLng::new(-20.0, 0.0), LatLng::new(-30.0, 0.0)], Direction::Descending)]
    #[case(&[LatLng::new(-20.0, 0.0), LatLng::new(-20.0, 5.0)], Direction::Descending)]
    fn derives_route_direction(#[case] points: &[LatLng], #[case] expected: Direction) {
        assert_eq!(route_direction(points), expected);
    }

    #[rstest]
    fn bounding_box_is_padded() {
        let rect = bounding_box(&[LatLng::new(1.0, 2.0), LatLng::new(-1.0, 3.0)], 0.5)
            .expect("non-empty input");
        assert_eq!(rect.min(), Coord { x: 1.5, y: -1.5 });
        assert_eq!(rect.max(), Coord { x: 3.5, y: 1.5 });
        assert!(bounding_box(&[], 0.5).is_none());
    }
}
