//! Google Maps and Waze deep links for a planned trip.

use chrono::{DateTime, Utc};
use url::form_urlencoded::byte_serialize;

use crate::geocode::GeocodeResult;

/// Links shared by every alternative of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationLinks {
    /// Google Maps directions.
    pub google: String,
    /// Waze live map; empty without place ids.
    pub waze: String,
}

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

/// Google Maps directions between two formatted addresses.
///
/// # Examples
///
/// ```
/// use tollroute_core::planner::google_maps_url;
///
/// let url = google_maps_url("Cuiabá, MT", "São Paulo, SP", &[]);
/// assert_eq!(
///     url,
///     "https://www.google.com/maps/dir/?api=1&origin=Cuiab%C3%A1%2C+MT&destination=S%C3%A3o+Paulo%2C+SP"
/// );
/// ```
#[must_use]
pub fn google_maps_url(origin: &str, destination: &str, waypoints: &[String]) -> String {
    let mut url = format!(
        "https://www.google.com/maps/dir/?api=1&origin={}&destination={}",
        encode(origin),
        encode(destination)
    );
    if !waypoints.is_empty() {
        url.push_str("&waypoints=");
        url.push_str(&encode(&waypoints.join("|")));
    }
    url
}

/// Waze directions departing now and arriving after `duration_s`.
///
/// Empty when either end has no place id.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "travel time is converted to whole milliseconds"
)]
pub fn waze_url(
    origin: &GeocodeResult,
    destination: &GeocodeResult,
    first_waypoint: Option<&GeocodeResult>,
    duration_s: f64,
    now: DateTime<Utc>,
) -> String {
    if origin.place_id.is_empty() || destination.place_id.is_empty() {
        return String::new();
    }
    let travel_ms = if duration_s.is_finite() {
        (duration_s * 1000.0).round() as i64
    } else {
        0
    };
    let arrival_ms = now.timestamp_millis().saturating_add(travel_ms);
    let mut url = format!(
        "https://www.waze.com/pt-BR/live-map/directions/br?to=place.{}&from=place.{}&time={arrival_ms}&reverse=yes",
        encode(&destination.place_id),
        encode(&origin.place_id),
    );
    if let Some(via) = first_waypoint.filter(|stop| !stop.place_id.is_empty()) {
        url.push_str("&via=place.");
        url.push_str(&encode(&via.place_id));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLng;
    use chrono::TimeZone;
    use rstest::rstest;

    fn place(id: &str) -> GeocodeResult {
        GeocodeResult {
            formatted_address: format!("place {id}"),
            place_id: id.to_owned(),
            location: LatLng::default(),
        }
    }

    #[rstest]
    fn google_link_joins_waypoints_with_pipes() {
        let url = google_maps_url("a", "b", &["x y".to_owned(), "z".to_owned()]);
        assert!(url.ends_with("&waypoints=x+y%7Cz"));
    }

    #[rstest]
    fn waze_link_needs_both_place_ids() {
        let now = Utc::now();
        assert!(waze_url(&place(""), &place("d"), None, 60.0, now).is_empty());
        assert!(waze_url(&place("o"), &place(""), None, 60.0, now).is_empty());
    }

    #[rstest]
    fn waze_link_adds_travel_time_and_via() {
        let now = Utc.timestamp_millis_opt(1_000).single().expect("valid instant");
        let url = waze_url(&place("o"), &place("d"), Some(&place("w")), 1.5, now);
        assert_eq!(
            url,
            "https://www.waze.com/pt-BR/live-map/directions/br?to=place.d&from=place.o&time=2500&reverse=yes&via=place.w"
        );
    }
}
