//! Points of interest persisted alongside routes: toll plazas, weigh
//! stations, fuel stations and the freight tariff table.

use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, LatLng};

/// Anything with a fixed position that can be matched against a route.
pub trait Located {
    /// Position of the item.
    fn location(&self) -> LatLng;

    /// Carriageway the item serves.
    fn direction(&self) -> Direction {
        Direction::Both
    }
}

/// A toll plaza as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toll {
    /// Row identifier.
    pub id: i64,
    /// Position.
    #[serde(flatten)]
    pub location: LatLng,
    /// Plaza name.
    pub name: String,
    /// Operating concession.
    pub concession: String,
    /// Road designation, e.g. `BR-116`.
    pub road: String,
    /// State code.
    pub uf: String,
    /// Carriageway served.
    pub direction: Direction,
    /// Base tariff for a two-axle vehicle.
    pub tariff: f64,
    /// Whether the plaza is barrier-free.
    pub free_flow: bool,
    /// Payment instructions for free-flow plazas.
    pub pay_free_flow: String,
}

impl Located for Toll {
    fn location(&self) -> LatLng {
        self.location
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}

/// An electronic toll tag brand and the concessions that accept it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TollTag {
    /// Brand name as used in the icon table, e.g. `semParar`.
    pub name: String,
    /// Comma-separated concession names.
    pub dealership_accepts: String,
}

impl TollTag {
    /// Whether the tag is accepted by `concession`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollroute_core::poi::TollTag;
    ///
    /// let tag = TollTag {
    ///     name: "veloe".to_owned(),
    ///     dealership_accepts: "CCR RioSP, Arteris Fernão Dias".to_owned(),
    /// };
    /// assert!(tag.accepts("ccr riosp"));
    /// assert!(!tag.accepts("Ecovias"));
    /// ```
    #[must_use]
    pub fn accepts(&self, concession: &str) -> bool {
        let wanted = concession.trim().to_lowercase();
        !wanted.is_empty()
            && self
                .dealership_accepts
                .split(',')
                .any(|name| name.trim().to_lowercase() == wanted)
    }
}

/// Arrival estimate at a toll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Straight-line distance, e.g. `12.34 km`.
    pub distance: String,
    /// Compact time, e.g. `1h2m3s`.
    pub time: String,
}

/// A toll as returned to the caller, priced for the request's vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollOutput {
    /// Row identifier.
    pub id: i64,
    /// Position.
    #[serde(flatten)]
    pub location: LatLng,
    /// Plaza name.
    pub name: String,
    /// Operating concession.
    pub concession: String,
    /// Concession artwork URL.
    pub concession_img: String,
    /// Road designation.
    pub road: String,
    /// State code.
    pub uf: String,
    /// Carriageway served.
    pub direction: Direction,
    /// Base tariff.
    pub tariff: f64,
    /// Whether the plaza is barrier-free.
    pub free_flow: bool,
    /// Payment instructions for free-flow plazas.
    pub pay_free_flow: String,
    /// Tag brands accepted here.
    pub accepted_tags: Vec<String>,
    /// Icon URLs for `accepted_tags`.
    pub tag_images: Vec<String>,
    /// Cost paid in cash.
    pub cash_cost: f64,
    /// Cost paid with a tag.
    pub tag_cost: f64,
    /// Cost paid with a prepaid card.
    pub prepaid_card_cost: f64,
    /// Always `BRL`.
    pub currency: String,
    /// Always `Brasil`.
    pub country: String,
    /// Always `Pedágio`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Arrival estimate from the route start.
    pub arrival: Arrival,
}

/// A weigh station (balança).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeighStation {
    /// Row identifier.
    pub id: i64,
    /// Position.
    #[serde(flatten)]
    pub location: LatLng,
    /// Station name.
    pub name: String,
    /// Operating concession.
    pub concession: String,
    /// Road designation.
    pub road: String,
    /// Kilometre marker.
    pub km: String,
    /// Carriageway served.
    pub direction: Direction,
    /// State code.
    pub uf: String,
}

impl Located for WeighStation {
    fn location(&self) -> LatLng {
        self.location
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}

/// A fuel station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelStation {
    /// Trading name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Municipality.
    pub municipality: String,
    /// Position.
    #[serde(flatten)]
    pub location: LatLng,
}

impl Located for FuelStation {
    fn location(&self) -> LatLng {
        self.location
    }
}

/// One row of the freight tariff table. Rates are per kilometre and stored
/// as text with either decimal separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreightLoadRow {
    /// Cargo category, used to group output.
    pub name: String,
    /// Cargo type.
    pub type_of_load: String,
    /// Tariff description.
    pub description: String,
    /// Two-axle rate.
    pub two_axes: String,
    /// Three-axle rate.
    pub three_axes: String,
    /// Four-axle rate.
    pub four_axes: String,
    /// Five-axle rate.
    pub five_axes: String,
    /// Six-axle rate.
    pub six_axes: String,
    /// Seven-axle rate.
    pub seven_axes: String,
    /// Nine-axle rate.
    pub nine_axes: String,
}
