//! Toll and fuel pricing.
//!
//! Route-level aggregates keep the formulae existing clients were built
//! against, including the second multiplication by the axle count.

use log::warn;

use crate::output::Costs;
use crate::request::{FuelProfile, VehicleType};

/// Discount applied to tag and prepaid-card payments.
pub const TAG_DISCOUNT: f64 = 0.05;

/// Cash cost of one toll for a vehicle.
///
/// Motorcycles pay half the tariff. Other known classes pay per axle, with
/// the tariff halved first when the axle count is odd. Unknown classes pay
/// nothing.
///
/// # Examples
///
/// ```
/// use tollroute_core::costs::toll_cash_cost;
/// use tollroute_core::request::VehicleType;
///
/// assert!((toll_cash_cost(10.0, VehicleType::Auto, 1) - 5.0).abs() < 1e-9);
/// assert!((toll_cash_cost(10.0, VehicleType::Truck, 4) - 40.0).abs() < 1e-9);
/// ```
#[must_use]
#[expect(clippy::float_arithmetic, reason = "tariffs are fractional currency")]
pub fn toll_cash_cost(tariff: f64, vehicle: VehicleType, axles: u8) -> f64 {
    match vehicle {
        VehicleType::Motorcycle => tariff / 2.0,
        VehicleType::Auto | VehicleType::Bus | VehicleType::Truck => {
            let base = if axles.is_multiple_of(2) { tariff } else { tariff / 2.0 };
            base * f64::from(axles)
        }
        VehicleType::Unknown => {
            warn!("unknown vehicle type; pricing toll at zero");
            0.0
        }
    }
}

/// Per-toll tag and prepaid-card cost: the cash cost less the discount,
/// rounded to whole reais.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "discount is a fraction")]
pub fn discounted_cost(cash_cost: f64) -> f64 {
    TAG_DISCOUNT.mul_add(-cash_cost, cash_cost).round()
}

/// Fuel cost for `distance_m` at `consumption` km/l, rounded to whole reais.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "fuel cost is fractional")]
pub fn fuel_cost(price: f64, consumption: f64, distance_m: f64) -> f64 {
    (price / consumption * (distance_m / 1000.0)).round()
}

/// Fuel cost at the mean of city and highway consumption.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "mean consumption is fractional")]
pub fn total_fuel_cost(fuel: &FuelProfile, distance_m: f64) -> f64 {
    let average = (fuel.consumption_city + fuel.consumption_hwy) / 2.0;
    fuel_cost(fuel.price, average, distance_m)
}

/// Cost breakdown for one alternative from its per-toll cash costs.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "aggregates are fractional")]
pub fn route_costs(cash_costs: &[f64], axles: u8, fuel: &FuelProfile, distance_m: f64) -> Costs {
    let tag_and_cash: f64 = cash_costs.iter().sum();
    let per_axle = f64::from(axles);
    let tag = TAG_DISCOUNT.mul_add(-tag_and_cash, tag_and_cash) * per_axle;
    let cash = tag_and_cash * per_axle;
    Costs {
        tag_and_cash,
        fuel_in_the_city: fuel_cost(fuel.price, fuel.consumption_city, distance_m),
        fuel_in_the_hwy: fuel_cost(fuel.price, fuel.consumption_hwy, distance_m),
        tag,
        cash,
        prepaid_card: cash,
        maximum_toll_cost: cash,
        minimum_toll_cost: cash,
        axles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn fuel() -> FuelProfile {
        FuelProfile {
            price: 6.0,
            consumption_city: 6.0,
            consumption_hwy: 8.0,
        }
    }

    #[rstest]
    #[case(VehicleType::Motorcycle, 2, 5.0)]
    #[case(VehicleType::Auto, 1, 5.0)]
    #[case(VehicleType::Auto, 2, 20.0)]
    #[case(VehicleType::Bus, 3, 15.0)]
    #[case(VehicleType::Truck, 5, 25.0)]
    #[case(VehicleType::Unknown, 5, 0.0)]
    fn prices_tolls_per_vehicle(
        #[case] vehicle: VehicleType,
        #[case] axles: u8,
        #[case] expected: f64,
    ) {
        let cost = toll_cash_cost(10.0, vehicle, axles);
        assert!((cost - expected).abs() < 1e-9, "got {cost}");
    }

    #[rstest]
    #[case(25.0, 24.0)]
    #[case(10.0, 10.0)]
    #[case(0.0, 0.0)]
    fn discounts_and_rounds(#[case] cash: f64, #[case] expected: f64) {
        assert!((discounted_cost(cash) - expected).abs() < 1e-9);
    }

    #[rstest]
    fn fuel_costs_use_each_consumption(fuel: FuelProfile) {
        let costs = route_costs(&[], 5, &fuel, 1_600_000.0);
        assert!((costs.fuel_in_the_city - 1_600.0).abs() < 1e-9);
        assert!((costs.fuel_in_the_hwy - 1_200.0).abs() < 1e-9);
        assert!((total_fuel_cost(&fuel, 1_600_000.0) - 1_371.0).abs() < 1e-9);
    }

    #[rstest]
    fn aggregates_multiply_by_axles(fuel: FuelProfile) {
        let costs = route_costs(&[10.0, 20.0], 2, &fuel, 0.0);
        assert!((costs.tag_and_cash - 30.0).abs() < 1e-9);
        assert!((costs.cash - 60.0).abs() < 1e-9);
        assert!((costs.tag - 57.0).abs() < 1e-9);
        assert_eq!(costs.cash, costs.prepaid_card);
        assert_eq!(costs.cash, costs.minimum_toll_cost);
        assert_eq!(costs.axles, 2);
    }
}
