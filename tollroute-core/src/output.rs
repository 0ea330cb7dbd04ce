//! Response documents returned by the planner.
//!
//! Field names follow the JSON contract consumed by existing clients, which
//! mixes snake and camel case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geocode::GeocodeResult;
use crate::geometry::LatLng;
use crate::instructions::Instruction;
use crate::poi::{FuelStation, TollOutput, WeighStation};
use crate::request::RouteOptions;

/// Full planning response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
    /// Request-level summary.
    pub summary: Summary,
    /// Planned alternatives.
    pub routes: Vec<RouteOutput>,
}

/// Request-level summary shared by every alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Resolved origin.
    pub location_origin: AddressInfo,
    /// Resolved destination.
    pub location_destination: AddressInfo,
    /// Resolved waypoints in travel order.
    pub all_stopping_points: Vec<GeocodeResult>,
    /// Fuel price echoed back.
    pub fuel_price: FuelPrice,
    /// Consumption figures echoed back.
    pub fuel_efficiency: FuelEfficiency,
    /// Section toggles applied to the routes.
    #[serde(default)]
    pub route_options: RouteOptions,
    /// Identifier of the history row for this request.
    #[serde(default)]
    pub route_hist_id: i64,
}

/// Resolved end point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// Position.
    pub location: LatLng,
    /// Human-readable address.
    pub address: String,
}

/// Fuel price block of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrice {
    /// Price per unit.
    pub value: f64,
    /// Currency code.
    pub currency: String,
    /// Distance unit.
    pub units: String,
    /// Fuel unit.
    pub fuel_unit: String,
}

impl FuelPrice {
    /// Price in reais per litre.
    #[must_use]
    pub fn brl_per_litre(value: f64) -> Self {
        Self {
            value,
            currency: "BRL".to_owned(),
            units: "km".to_owned(),
            fuel_unit: "liter".to_owned(),
        }
    }
}

/// Consumption block of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelEfficiency {
    /// Kilometres per litre in town.
    pub city: f64,
    /// Kilometres per litre on the highway.
    pub hwy: f64,
    /// Distance unit.
    pub units: String,
    /// Fuel unit.
    pub fuel_unit: String,
}

impl FuelEfficiency {
    /// Consumption in kilometres per litre.
    #[must_use]
    pub fn km_per_litre(city: f64, hwy: f64) -> Self {
        Self {
            city,
            hwy,
            units: "km".to_owned(),
            fuel_unit: "liter".to_owned(),
        }
    }
}

/// One planned alternative.
///
/// Optional sections are omitted from JSON when the matching route option is
/// off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutput {
    /// Headline figures.
    pub summary: RouteSummary,
    /// Toll and fuel cost breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<Costs>,
    /// Tolls in travel order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolls: Option<Vec<TollOutput>>,
    /// Weigh stations on the route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<Vec<WeighStation>>,
    /// Fuel stations in the corridor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_stations: Option<Vec<FuelStation>>,
    /// Turn-by-turn instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<Instruction>>,
    /// Freight tariffs grouped by cargo category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freight_load: Option<BTreeMap<String, Vec<FreightEntry>>>,
    /// Encoded geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

/// Headline figures of an alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Profile label: `fatest`, `cheapest` or `efficient`.
    pub route_type: String,
    /// Whether any toll was matched.
    #[serde(rename = "hasTolls")]
    pub has_tolls: bool,
    /// Route length.
    pub distance: Measure,
    /// Travel time.
    pub duration: Measure,
    /// Google Maps link.
    pub url: String,
    /// Waze link, empty when place ids are missing.
    pub url_waze: String,
    /// Fuel cost at the average consumption.
    pub total_fuel_cost: f64,
}

/// A figure with its display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Display text.
    pub text: String,
    /// Raw value in metres or seconds.
    pub value: f64,
}

/// Cost breakdown of an alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Costs {
    /// Sum of per-toll cash costs.
    #[serde(rename = "tagAndCash")]
    pub tag_and_cash: f64,
    /// Fuel cost at city consumption.
    pub fuel_in_the_city: f64,
    /// Fuel cost at highway consumption.
    pub fuel_in_the_hwy: f64,
    /// Tag total.
    pub tag: f64,
    /// Cash total.
    pub cash: f64,
    /// Prepaid card total.
    #[serde(rename = "prepaidCard")]
    pub prepaid_card: f64,
    /// Upper toll estimate.
    #[serde(rename = "maximumTollCost")]
    pub maximum_toll_cost: f64,
    /// Lower toll estimate.
    #[serde(rename = "minimumTollCost")]
    pub minimum_toll_cost: f64,
    /// Axle count echoed back.
    pub axles: u8,
}

/// One freight tariff line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreightEntry {
    /// Tariff description.
    pub description: String,
    /// Cargo type.
    pub type_of_load: String,
    /// Axle count the rate applies to.
    pub qtd_axle: u8,
    /// Rate times distance, two decimals.
    pub total_value: f64,
}

/// Response of the simple route operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRouteOutput {
    /// Summary block.
    pub summary: SimpleRouteSummary,
}

/// Summary of a simple route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRouteSummary {
    /// Reverse-geocoded origin.
    pub location_origin: AddressInfo,
    /// Reverse-geocoded destination.
    pub location_destination: AddressInfo,
    /// Distance and duration.
    pub routes: SimpleRouteFigures,
}

/// Distance and duration of a simple route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRouteFigures {
    /// Route length.
    pub distance: Measure,
    /// Travel time.
    pub duration: Measure,
}
