//! OSRM Route API response types.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service>

use serde::Deserialize;
use tollroute_core::LatLng;
use tollroute_core::instructions::{Maneuver, ManeuverKind, Modifier};
use tollroute_core::routing::RoutingAlternative;

/// OSRM Route API response.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code, `"Ok"` on success; `"NoRoute"` or `"InvalidQuery"` otherwise.
    pub code: String,
    /// Error message when `code` is not `"Ok"`.
    pub message: Option<String>,
    /// Alternatives, best first.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl RouteResponse {
    /// Whether the engine reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// One alternative.
#[derive(Debug, Deserialize)]
pub struct Route {
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    /// Encoded polyline, present with `overview=full`.
    #[serde(default)]
    pub geometry: String,
    /// One leg per consecutive waypoint pair.
    #[serde(default)]
    pub legs: Vec<Leg>,
}

/// Portion of a route between two waypoints.
#[derive(Debug, Deserialize)]
pub struct Leg {
    /// Steps, present with `steps=true`.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One maneuver plus the road travelled after it.
#[derive(Debug, Deserialize)]
pub struct Step {
    /// Road name; empty for unnamed roads.
    #[serde(default)]
    pub name: String,
    /// Maneuver at the start of the step.
    pub maneuver: StepManeuver,
}

/// Maneuver details.
#[derive(Debug, Deserialize)]
pub struct StepManeuver {
    /// `[lng, lat]`.
    pub location: [f64; 2],
    /// Maneuver type such as `turn` or `depart`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Direction hint such as `slight left`.
    #[serde(default)]
    pub modifier: Option<String>,
}

impl From<Step> for Maneuver {
    fn from(step: Step) -> Self {
        let [lng, lat] = step.maneuver.location;
        Self {
            kind: ManeuverKind::parse(&step.maneuver.kind),
            modifier: step
                .maneuver
                .modifier
                .as_deref()
                .map_or(Modifier::None, Modifier::parse),
            street_name: step.name,
            location: LatLng::new(lat, lng),
        }
    }
}

impl From<Route> for RoutingAlternative {
    /// Only the first leg's steps are kept.
    fn from(route: Route) -> Self {
        let steps = route
            .legs
            .into_iter()
            .next()
            .map(|leg| leg.steps.into_iter().map(Maneuver::from).collect())
            .unwrap_or_default();
        Self {
            distance_m: route.distance,
            duration_s: route.duration,
            geometry: route.geometry,
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SUCCESS: &str = r#"{
        "code": "Ok",
        "routes": [{
            "distance": 1523.4,
            "duration": 180.2,
            "geometry": "_p~iF~ps|U_ulLnnqC",
            "legs": [
                {"steps": [
                    {"name": "Avenida Paulista", "maneuver": {"location": [-46.65, -23.56], "type": "depart"}},
                    {"name": "", "maneuver": {"location": [-46.64, -23.55], "type": "turn", "modifier": "slight left"}}
                ]},
                {"steps": [
                    {"name": "Rua Augusta", "maneuver": {"location": [-46.63, -23.54], "type": "arrive"}}
                ]}
            ]
        }]
    }"#;

    #[rstest]
    fn deserialises_success_response() {
        let response: RouteResponse = serde_json::from_str(SUCCESS).expect("should deserialise");
        assert!(response.is_ok());
        assert_eq!(response.routes.len(), 1);
    }

    #[rstest]
    fn keeps_first_leg_steps_only() {
        let response: RouteResponse = serde_json::from_str(SUCCESS).expect("should deserialise");
        let route = response.routes.into_iter().next().expect("one route");
        let alternative = RoutingAlternative::from(route);
        assert_eq!(alternative.steps.len(), 2);
        let turn = alternative.steps.get(1).expect("second step");
        assert_eq!(turn.kind, ManeuverKind::Turn);
        assert_eq!(turn.modifier, Modifier::SlightLeft);
        assert_eq!(turn.location, LatLng::new(-23.55, -46.64));
        assert!(turn.street_name.is_empty());
    }

    #[rstest]
    fn deserialises_error_response() {
        let json = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        let response: RouteResponse = serde_json::from_str(json).expect("should deserialise");
        assert!(!response.is_ok());
        assert!(response.routes.is_empty());
        assert_eq!(
            response.message.as_deref(),
            Some("Impossible route between points")
        );
    }

    #[rstest]
    fn missing_legs_yield_no_steps() {
        let json = r#"{"distance": 10.0, "duration": 2.0, "geometry": "??"}"#;
        let route: Route = serde_json::from_str(json).expect("should deserialise");
        assert!(RoutingAlternative::from(route).steps.is_empty());
    }
}
