//! Per-alternative enrichment: POI matching, instructions, costs and
//! freight. Everything here blocks and runs on the blocking pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::assets::AssetUrls;
use crate::cache::EtaMemo;
use crate::costs::{discounted_cost, route_costs, toll_cash_cost, total_fuel_cost};
use crate::format::{self, compact_duration, whole_seconds};
use crate::freight::freight_table;
use crate::geometry::{LatLng, haversine_m};
use crate::instructions::instruction;
use crate::matcher::{
    PoiIndex, fuel_station_query_box, match_fuel_stations, match_tolls, match_weigh_stations,
};
use crate::output::{FreightEntry, RouteOutput, RouteSummary};
use crate::poi::{Arrival, FreightLoadRow, FuelStation, Toll, TollOutput, TollTag, WeighStation};
use crate::polyline;
use crate::request::{TripProfile, TypeRoute};
use crate::routing::{Profile, ProfileRoutes, RoutingAlternative};
use crate::store::{RouteStore, StoreError};

use super::links::NavigationLinks;

/// Average speed used for toll arrival estimates.
const ARRIVAL_SPEED_KMH: f64 = 60.0;

/// Inputs of the enrichment phase, owned so it can move to another thread.
pub(crate) struct Assembly {
    pub(crate) store: Arc<dyn RouteStore>,
    pub(crate) eta: Arc<EtaMemo>,
    pub(crate) assets: AssetUrls,
    pub(crate) corridor_m: f64,
    pub(crate) trip: TripProfile,
    pub(crate) links: NavigationLinks,
}

/// POI tables loaded once per request.
struct Universe {
    tolls: PoiIndex<Toll>,
    tags: Vec<TollTag>,
    weigh_stations: PoiIndex<WeighStation>,
    fuel_stations: Vec<FuelStation>,
    freight_rows: Vec<FreightLoadRow>,
}

fn or_empty<T>(what: &str, loaded: Result<Vec<T>, StoreError>) -> Vec<T> {
    loaded.unwrap_or_else(|err| {
        warn!("loading {what} failed, continuing without them: {err}");
        Vec::new()
    })
}

fn decode_or_empty(geometry: &str) -> Vec<LatLng> {
    polyline::decode(geometry).unwrap_or_else(|err| {
        warn!("undecodable route geometry, skipping POI matching: {err}");
        Vec::new()
    })
}

/// Arrival estimate at `to` from `from` at the average speed.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "distance and time are fractional")]
pub fn arrival_estimate(from: LatLng, to: LatLng) -> Arrival {
    let km = haversine_m(from, to) / 1000.0;
    let seconds = (km / ARRIVAL_SPEED_KMH * 3_600.0).round();
    Arrival {
        distance: format!("{km:.2} km"),
        time: compact_duration(whole_seconds(seconds)),
    }
}

#[expect(clippy::float_arithmetic, reason = "metres are scaled to kilometres")]
fn kilometres(metres: f64) -> f64 {
    metres / 1000.0
}

impl Assembly {
    /// Enrich every alternative, sort within profiles and apply the
    /// requested route family.
    pub(crate) fn run(&self, routes: &ProfileRoutes) -> Vec<RouteOutput> {
        let universe = self.load(routes);
        let per_profile: Vec<(Profile, Vec<RouteOutput>)> = Profile::ALL
            .into_iter()
            .map(|profile| {
                let mut scored: Vec<(usize, RouteOutput)> = routes
                    .get(profile)
                    .iter()
                    .map(|alternative| self.route_output(profile, alternative, &universe))
                    .collect();
                scored.sort_by_key(|(tolls, _)| *tolls);
                (profile, scored.into_iter().map(|(_, out)| out).collect())
            })
            .collect();

        let wanted = match self.trip.type_route {
            TypeRoute::Fastest => Some(Profile::Fastest),
            TypeRoute::Cheapest => Some(Profile::Cheapest),
            TypeRoute::Efficient => Some(Profile::Efficient),
            TypeRoute::Any => None,
        };
        match wanted {
            Some(profile) => per_profile
                .into_iter()
                .find(|(candidate, _)| *candidate == profile)
                .and_then(|(_, outputs)| outputs.into_iter().next())
                .into_iter()
                .collect(),
            None => per_profile
                .into_iter()
                .flat_map(|(_, outputs)| outputs)
                .collect(),
        }
    }

    fn load(&self, routes: &ProfileRoutes) -> Universe {
        let options = self.trip.options;
        let tolls = PoiIndex::new(or_empty("tolls", self.store.get_tolls()));
        let tags = if options.include_toll_costs {
            or_empty("toll tags", self.store.get_toll_tags())
        } else {
            Vec::new()
        };
        let weigh_stations = if options.include_weigh_stations {
            PoiIndex::new(or_empty("weigh stations", self.store.get_balanca()))
        } else {
            PoiIndex::new(Vec::new())
        };
        let freight_rows = if options.include_freight_calc {
            or_empty("freight tariffs", self.store.get_freight_loads())
        } else {
            Vec::new()
        };
        let fuel_stations = if options.include_fuel_stations {
            self.fuel_stations_for(routes.get(Profile::Fastest).first())
        } else {
            Vec::new()
        };
        debug!(
            "POI universe: {} tolls, {} weigh stations, {} fuel stations on the fastest route",
            tolls.len(),
            weigh_stations.len(),
            fuel_stations.len()
        );
        Universe {
            tolls,
            tags,
            weigh_stations,
            fuel_stations,
            freight_rows,
        }
    }

    fn fuel_stations_for(&self, reference: Option<&RoutingAlternative>) -> Vec<FuelStation> {
        let Some(alternative) = reference else {
            return Vec::new();
        };
        let points = decode_or_empty(&alternative.geometry);
        let Some(area) = fuel_station_query_box(&points) else {
            return Vec::new();
        };
        let candidates = or_empty("fuel stations", self.store.get_gas_stations_in_bbox(&area));
        match_fuel_stations(candidates, &points, self.corridor_m)
    }

    fn route_output(
        &self,
        profile: Profile,
        alternative: &RoutingAlternative,
        universe: &Universe,
    ) -> (usize, RouteOutput) {
        let options = self.trip.options;
        let points = decode_or_empty(&alternative.geometry);
        let matched = match_tolls(&universe.tolls, &points, self.corridor_m);
        let toll_count = matched.len();
        let start = points.first().copied();
        let tolls: Vec<TollOutput> = matched
            .into_iter()
            .map(|toll| self.toll_output(toll, start, &universe.tags))
            .collect();
        let cash_costs: Vec<f64> = tolls.iter().map(|toll| toll.cash_cost).collect();

        let output = RouteOutput {
            summary: RouteSummary {
                route_type: profile.label().to_owned(),
                has_tolls: toll_count > 0,
                distance: format::distance(alternative.distance_m),
                duration: format::duration(alternative.duration_s),
                url: self.links.google.clone(),
                url_waze: self.links.waze.clone(),
                total_fuel_cost: total_fuel_cost(&self.trip.fuel, alternative.distance_m),
            },
            costs: options.include_toll_costs.then(|| {
                route_costs(
                    &cash_costs,
                    self.trip.axles,
                    &self.trip.fuel,
                    alternative.distance_m,
                )
            }),
            tolls: options.include_toll_costs.then_some(tolls),
            balances: options.include_weigh_stations.then(|| {
                match_weigh_stations(&universe.weigh_stations, &points, self.corridor_m)
            }),
            gas_stations: options
                .include_fuel_stations
                .then(|| universe.fuel_stations.clone()),
            instructions: options.include_route_map.then(|| {
                alternative
                    .steps
                    .iter()
                    .map(|step| instruction(step, &self.assets))
                    .collect()
            }),
            freight_load: options
                .include_freight_calc
                .then(|| self.freight(&universe.freight_rows, alternative.distance_m)),
            polyline: options
                .include_polyline
                .then(|| alternative.geometry.clone()),
        };
        (toll_count, output)
    }

    fn freight(
        &self,
        rows: &[FreightLoadRow],
        distance_m: f64,
    ) -> BTreeMap<String, Vec<FreightEntry>> {
        freight_table(rows, self.trip.axles, kilometres(distance_m))
    }

    fn toll_output(&self, toll: Toll, start: Option<LatLng>, tags: &[TollTag]) -> TollOutput {
        let cash_cost = toll_cash_cost(toll.tariff, self.trip.vehicle, self.trip.axles);
        let discounted = discounted_cost(cash_cost);
        let accepted_tags: Vec<String> = tags
            .iter()
            .filter(|tag| tag.accepts(&toll.concession))
            .map(|tag| tag.name.clone())
            .collect();
        let tag_images = accepted_tags
            .iter()
            .filter_map(|tag| self.assets.tag_icon(tag))
            .collect();
        let from = start.unwrap_or(toll.location);
        let arrival = self
            .eta
            .get_or_insert_with(&from.key_fragment(), toll.id, || {
                arrival_estimate(from, toll.location)
            });
        TollOutput {
            id: toll.id,
            location: toll.location,
            concession_img: self.assets.concession_image(&toll.concession),
            name: toll.name,
            concession: toll.concession,
            road: toll.road,
            uf: toll.uf,
            direction: toll.direction,
            tariff: toll.tariff,
            free_flow: toll.free_flow,
            pay_free_flow: toll.pay_free_flow,
            accepted_tags,
            tag_images,
            cash_cost,
            tag_cost: discounted,
            prepaid_card_cost: discounted,
            currency: "BRL".to_owned(),
            country: "Brasil".to_owned(),
            kind: "Pedágio".to_owned(),
            arrival,
        }
    }
}

/// Summary-only route built from the first available alternative of
/// efficient, fastest then cheapest.
pub(crate) fn minimal_route(
    routes: &ProfileRoutes,
    trip: &TripProfile,
    links: &NavigationLinks,
) -> Option<RouteOutput> {
    let alternative = [Profile::Efficient, Profile::Fastest, Profile::Cheapest]
        .into_iter()
        .find_map(|profile| routes.get(profile).first())?;
    Some(RouteOutput {
        summary: RouteSummary {
            route_type: Profile::Efficient.label().to_owned(),
            has_tolls: false,
            distance: format::distance(alternative.distance_m),
            duration: format::duration(alternative.duration_s),
            url: links.google.clone(),
            url_waze: links.waze.clone(),
            total_fuel_cost: total_fuel_cost(&trip.fuel, alternative.distance_m),
        },
        costs: None,
        tolls: None,
        balances: None,
        gas_stations: None,
        instructions: None,
        freight_load: None,
        polyline: None,
    })
}
