//! Route requests as they arrive on the wire and in validated form.
//!
//! Payload types mirror the JSON bodies accepted by the HTTP layer and the
//! CLI. Converting a payload with [`TryFrom`] yields the validated request the
//! planner works with.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::geometry::LatLng;

/// Largest axle count with a freight tariff column.
pub const MAX_AXLES: u8 = 9;

/// Vehicle class used to price tolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    /// Motorcycles pay half the base tariff.
    Motorcycle,
    /// Passenger cars.
    Auto,
    /// Buses.
    Bus,
    /// Trucks.
    Truck,
    /// Any other value; tolls are priced at zero.
    Unknown,
}

impl VehicleType {
    /// Parse a vehicle type case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "motorcycle" => Self::Motorcycle,
            "auto" => Self::Auto,
            "bus" => Self::Bus,
            "truck" => Self::Truck,
            _ => Self::Unknown,
        }
    }

    /// Lowercase name used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Motorcycle => "motorcycle",
            Self::Auto => "auto",
            Self::Bus => "bus",
            Self::Truck => "truck",
            Self::Unknown => "unknown",
        }
    }
}

/// Which profile families the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeRoute {
    /// Only the best fastest alternative.
    Fastest,
    /// Only the best toll-avoiding alternative.
    Cheapest,
    /// Only the best motorway-avoiding alternative.
    Efficient,
    /// Every alternative of every profile.
    #[default]
    Any,
}

impl TypeRoute {
    /// Parse the `typeRoute` field, accepting English and Portuguese aliases.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollroute_core::request::TypeRoute;
    ///
    /// assert_eq!(TypeRoute::parse("Rápida"), TypeRoute::Fastest);
    /// assert_eq!(TypeRoute::parse("barata"), TypeRoute::Cheapest);
    /// assert_eq!(TypeRoute::parse(""), TypeRoute::Any);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "fastest" | "fatest" | "fast" | "rapida" | "rápida" => Self::Fastest,
            "cheapest" | "cheap" | "barata" => Self::Cheapest,
            "efficient" | "eficiente" => Self::Efficient,
            _ => Self::Any,
        }
    }
}

/// Whether a request is billed against a public token or a private user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Anonymous caller identified by a public token; subject to quota.
    Public,
    /// Authenticated user.
    #[default]
    Private,
}

impl Scope {
    /// `public` case-insensitively selects [`Scope::Public`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("public") {
            Self::Public
        } else {
            Self::Private
        }
    }

    /// Whether this is the public scope.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Output sections a caller opts into.
///
/// A missing `route_options` object enables everything; inside a present
/// object a missing flag reads as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag maps to one JSON field"
)]
pub struct RouteOptions {
    /// Include fuel stations along the route.
    #[serde(default)]
    pub include_fuel_stations: bool,
    /// Include turn-by-turn instructions.
    #[serde(default)]
    pub include_route_map: bool,
    /// Include tolls and the cost breakdown.
    #[serde(default)]
    pub include_toll_costs: bool,
    /// Include weigh stations.
    #[serde(default)]
    pub include_weigh_stations: bool,
    /// Include the freight tariff table.
    #[serde(default)]
    pub include_freight_calc: bool,
    /// Include the encoded geometry.
    #[serde(default)]
    pub include_polyline: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            include_fuel_stations: true,
            include_route_map: true,
            include_toll_costs: true,
            include_weigh_stations: true,
            include_freight_calc: true,
            include_polyline: true,
        }
    }
}

impl RouteOptions {
    /// Every section disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            include_fuel_stations: false,
            include_route_map: false,
            include_toll_costs: false,
            include_weigh_stations: false,
            include_freight_calc: false,
            include_polyline: false,
        }
    }

    /// Whether the caller asked for the bare summary only.
    #[must_use]
    pub const fn is_minimal(&self) -> bool {
        !(self.include_fuel_stations
            || self.include_route_map
            || self.include_toll_costs
            || self.include_weigh_stations
            || self.include_freight_calc
            || self.include_polyline)
    }
}

/// Price and consumption figures used for fuel costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelProfile {
    /// Price per litre.
    pub price: f64,
    /// Kilometres per litre in town.
    pub consumption_city: f64,
    /// Kilometres per litre on the highway.
    pub consumption_hwy: f64,
}

/// Validation failures for incoming requests.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    /// Origin was blank.
    #[error("origem é obrigatória")]
    MissingOrigin,
    /// Destination was blank.
    #[error("destino é obrigatório")]
    MissingDestination,
    /// Axle count outside `1..=9`.
    #[error("quantidade de eixos deve estar entre 1 e {MAX_AXLES}, recebido {0}")]
    InvalidAxles(i64),
    /// A consumption figure was zero, negative or not a number.
    #[error("consumo {field} deve ser maior que zero")]
    InvalidConsumption {
        /// Either `cidade` or `rodovia`.
        field: &'static str,
    },
    /// Fuel price was negative or not a number.
    #[error("preço do combustível não pode ser negativo")]
    InvalidPrice,
    /// A coordinate was outside the WGS84 range.
    #[error("coordenada inválida para {which}")]
    InvalidCoordinate {
        /// Which point failed.
        which: &'static str,
    },
}

/// Vehicle, fuel and presentation fields shared by every planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPayload {
    /// City consumption in km/l.
    #[serde(rename = "consumptionCity")]
    pub consumption_city: f64,
    /// Highway consumption in km/l.
    #[serde(rename = "consumptionHwy")]
    pub consumption_hwy: f64,
    /// Fuel price per litre.
    pub price: f64,
    /// Axle count.
    pub axles: i64,
    /// Vehicle type, free text.
    #[serde(rename = "type")]
    pub vehicle_type: String,
    /// Requested route family, free text.
    #[serde(rename = "typeRoute")]
    pub type_route: String,
    /// `public` or anything else for private.
    #[serde(rename = "publicOrPrivate", alias = "public_or_private")]
    pub public_or_private: String,
    /// Save the result as a favourite.
    #[serde(default)]
    pub favorite: bool,
    /// Optional section toggles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_options: Option<RouteOptions>,
}

/// Validated counterpart of [`TripPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripProfile {
    /// Axle count in `1..=9`.
    pub axles: u8,
    /// Vehicle class.
    pub vehicle: VehicleType,
    /// Fuel figures.
    pub fuel: FuelProfile,
    /// Requested route family.
    pub type_route: TypeRoute,
    /// Billing scope.
    pub scope: Scope,
    /// Save as favourite.
    pub favorite: bool,
    /// Section toggles.
    pub options: RouteOptions,
}

impl TryFrom<TripPayload> for TripProfile {
    type Error = RequestError;

    fn try_from(payload: TripPayload) -> Result<Self, Self::Error> {
        let axles = u8::try_from(payload.axles)
            .ok()
            .filter(|n| (1..=MAX_AXLES).contains(n))
            .ok_or(RequestError::InvalidAxles(payload.axles))?;
        if !(payload.consumption_city.is_finite() && payload.consumption_city > 0.0) {
            return Err(RequestError::InvalidConsumption { field: "cidade" });
        }
        if !(payload.consumption_hwy.is_finite() && payload.consumption_hwy > 0.0) {
            return Err(RequestError::InvalidConsumption { field: "rodovia" });
        }
        if !(payload.price.is_finite() && payload.price >= 0.0) {
            return Err(RequestError::InvalidPrice);
        }
        Ok(Self {
            axles,
            vehicle: VehicleType::parse(&payload.vehicle_type),
            fuel: FuelProfile {
                price: payload.price,
                consumption_city: payload.consumption_city,
                consumption_hwy: payload.consumption_hwy,
            },
            type_route: TypeRoute::parse(&payload.type_route),
            scope: Scope::parse(&payload.public_or_private),
            favorite: payload.favorite,
            options: payload.route_options.unwrap_or_default(),
        })
    }
}

/// JSON body of an address-based planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequestPayload {
    /// Free-text origin.
    pub origin: String,
    /// Free-text destination.
    pub destination: String,
    /// Free-text intermediate stops.
    #[serde(default)]
    pub waypoints: Vec<String>,
    /// Shared trip fields.
    #[serde(flatten)]
    pub trip: TripPayload,
}

/// Validated address-based planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Trimmed origin.
    pub origin: String,
    /// Trimmed destination.
    pub destination: String,
    /// Trimmed, non-empty waypoints in order.
    pub waypoints: Vec<String>,
    /// Shared trip fields.
    pub trip: TripProfile,
}

impl RouteRequest {
    /// Waypoints joined with commas, as stored in history keys.
    #[must_use]
    pub fn waypoints_key(&self) -> String {
        self.waypoints.join(",")
    }
}

impl TryFrom<RouteRequestPayload> for RouteRequest {
    type Error = RequestError;

    fn try_from(payload: RouteRequestPayload) -> Result<Self, Self::Error> {
        let origin = payload.origin.trim().to_owned();
        if origin.is_empty() {
            return Err(RequestError::MissingOrigin);
        }
        let destination = payload.destination.trim().to_owned();
        if destination.is_empty() {
            return Err(RequestError::MissingDestination);
        }
        Ok(Self {
            origin,
            destination,
            waypoints: clean_waypoints(payload.waypoints),
            trip: TripProfile::try_from(payload.trip)?,
        })
    }
}

/// JSON body of a coordinate-based planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRouteRequestPayload {
    /// Origin latitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub origin_lat: f64,
    /// Origin longitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub origin_lng: f64,
    /// Destination latitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub destination_lat: f64,
    /// Destination longitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub destination_lng: f64,
    /// Intermediate stops.
    #[serde(default)]
    pub waypoints: Vec<LatLng>,
    /// Shared trip fields.
    #[serde(flatten)]
    pub trip: TripPayload,
}

/// Validated coordinate-based planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRouteRequest {
    /// Origin position.
    pub origin: LatLng,
    /// Destination position.
    pub destination: LatLng,
    /// Intermediate stops in order.
    pub waypoints: Vec<LatLng>,
    /// Shared trip fields.
    pub trip: TripProfile,
}

impl TryFrom<CoordinateRouteRequestPayload> for CoordinateRouteRequest {
    type Error = RequestError;

    fn try_from(payload: CoordinateRouteRequestPayload) -> Result<Self, Self::Error> {
        let origin = LatLng::new(payload.origin_lat, payload.origin_lng);
        if !origin.is_valid() {
            return Err(RequestError::InvalidCoordinate { which: "origem" });
        }
        let destination = LatLng::new(payload.destination_lat, payload.destination_lng);
        if !destination.is_valid() {
            return Err(RequestError::InvalidCoordinate { which: "destino" });
        }
        if payload.waypoints.iter().any(|p| !p.is_valid()) {
            return Err(RequestError::InvalidCoordinate { which: "parada" });
        }
        Ok(Self {
            origin,
            destination,
            waypoints: payload.waypoints,
            trip: TripProfile::try_from(payload.trip)?,
        })
    }
}

/// Body of a simple route request: two positions, no extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRouteRequest {
    /// Origin latitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub origin_lat: f64,
    /// Origin longitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub origin_lng: f64,
    /// Destination latitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub destination_lat: f64,
    /// Destination longitude.
    #[serde(deserialize_with = "lenient_f64")]
    pub destination_lng: f64,
}

impl SimpleRouteRequest {
    /// Validated origin and destination.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidCoordinate`] when either end lies
    /// outside the WGS84 range.
    pub fn endpoints(&self) -> Result<(LatLng, LatLng), RequestError> {
        let origin = LatLng::new(self.origin_lat, self.origin_lng);
        if !origin.is_valid() {
            return Err(RequestError::InvalidCoordinate { which: "origem" });
        }
        let destination = LatLng::new(self.destination_lat, self.destination_lng);
        if !destination.is_valid() {
            return Err(RequestError::InvalidCoordinate { which: "destino" });
        }
        Ok((origin, destination))
    }
}

fn clean_waypoints(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|w| w.trim().to_owned())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Accept a JSON number or a numeric string.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn body() -> serde_json::Value {
        json!({
            "origin": " Cuiabá, Mato Grosso ",
            "destination": "São Paulo, São Paulo",
            "waypoints": ["", "  Campo Grande  "],
            "consumptionCity": 6.0,
            "consumptionHwy": 8.0,
            "price": 6.0,
            "axles": 5,
            "type": "Truck",
            "typeRoute": "fastest",
            "publicOrPrivate": "private"
        })
    }

    fn parse(value: serde_json::Value) -> Result<RouteRequest, RequestError> {
        let payload: RouteRequestPayload = serde_json::from_value(value).expect("payload");
        RouteRequest::try_from(payload)
    }

    #[rstest]
    fn validates_well_formed_body(body: serde_json::Value) {
        let request = parse(body).expect("valid");
        assert_eq!(request.origin, "Cuiabá, Mato Grosso");
        assert_eq!(request.waypoints, vec!["Campo Grande".to_owned()]);
        assert_eq!(request.trip.vehicle, VehicleType::Truck);
        assert_eq!(request.trip.type_route, TypeRoute::Fastest);
        assert_eq!(request.trip.scope, Scope::Private);
        assert_eq!(request.trip.options, RouteOptions::default());
        assert!(!request.trip.favorite);
    }

    #[rstest]
    #[case("axles", json!(0), RequestError::InvalidAxles(0))]
    #[case("axles", json!(10), RequestError::InvalidAxles(10))]
    #[case("consumptionCity", json!(0.0), RequestError::InvalidConsumption { field: "cidade" })]
    #[case("consumptionHwy", json!(-1.0), RequestError::InvalidConsumption { field: "rodovia" })]
    #[case("price", json!(-0.5), RequestError::InvalidPrice)]
    #[case("origin", json!("   "), RequestError::MissingOrigin)]
    #[case("destination", json!(""), RequestError::MissingDestination)]
    fn rejects_invalid_fields(
        mut body: serde_json::Value,
        #[case] field: &str,
        #[case] value: serde_json::Value,
        #[case] expected: RequestError,
    ) {
        body[field] = value;
        assert_eq!(parse(body), Err(expected));
    }

    #[rstest]
    fn public_scope_alias_and_partial_options(mut body: serde_json::Value) {
        body["publicOrPrivate"] = json!("PUBLIC");
        body["route_options"] = json!({"include_toll_costs": true});
        let request = parse(body).expect("valid");
        assert!(request.trip.scope.is_public());
        assert!(request.trip.options.include_toll_costs);
        assert!(!request.trip.options.include_polyline);
    }

    #[rstest]
    #[case("MOTORCYCLE", VehicleType::Motorcycle)]
    #[case("bus", VehicleType::Bus)]
    #[case("tractor", VehicleType::Unknown)]
    fn parses_vehicle_types(#[case] raw: &str, #[case] expected: VehicleType) {
        assert_eq!(VehicleType::parse(raw), expected);
    }

    #[rstest]
    fn coordinate_payload_accepts_numeric_strings(body: serde_json::Value) {
        let mut value = body;
        value["origin_lat"] = json!("-15.6");
        value["origin_lng"] = json!(-56.1);
        value["destination_lat"] = json!("-23.55");
        value["destination_lng"] = json!("-46.63");
        value["waypoints"] = json!([{"lat": -20.4, "lng": -54.6}]);
        let payload: CoordinateRouteRequestPayload =
            serde_json::from_value(value).expect("payload");
        let request = CoordinateRouteRequest::try_from(payload).expect("valid");
        assert_eq!(request.origin, LatLng::new(-15.6, -56.1));
        assert_eq!(request.waypoints.len(), 1);
    }

    #[rstest]
    fn minimal_options_detected() {
        assert!(RouteOptions::none().is_minimal());
        assert!(!RouteOptions::default().is_minimal());
    }
}
