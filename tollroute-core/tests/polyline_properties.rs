//! Property-based tests for the polyline codec.
//!
//! # Invariants tested
//!
//! - **Round trip:** decoding an encoded route recovers every point to within
//!   the 1e-5 degree precision of the format.
//! - **Length:** the number of points survives the round trip.

#![expect(clippy::float_arithmetic, reason = "tolerances compare coordinate differences")]

use proptest::prelude::*;
use tollroute_core::LatLng;
use tollroute_core::polyline::{decode, encode};

/// Half a unit of the fifth decimal place plus float slack.
const TOLERANCE: f64 = 0.000_005_1;

fn point_strategy() -> impl Strategy<Value = LatLng> {
    (-90.0_f64..=90.0, -180.0_f64..=180.0).prop_map(|(lat, lng)| LatLng::new(lat, lng))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: decode inverts encode up to the format's precision.
    #[test]
    fn round_trip_within_precision(points in prop::collection::vec(point_strategy(), 0..64)) {
        let decoded = decode(&encode(&points)).expect("encoded polylines decode");
        prop_assert_eq!(decoded.len(), points.len());
        for (got, want) in decoded.iter().zip(&points) {
            prop_assert!((got.lat - want.lat).abs() <= TOLERANCE, "lat {} vs {}", got.lat, want.lat);
            prop_assert!((got.lng - want.lng).abs() <= TOLERANCE, "lng {} vs {}", got.lng, want.lng);
        }
    }

    /// Property: encoding is stable once points sit on the 1e-5 grid.
    #[test]
    fn re_encoding_is_stable(points in prop::collection::vec(point_strategy(), 1..32)) {
        let once = encode(&points);
        let snapped = decode(&once).expect("encoded polylines decode");
        prop_assert_eq!(encode(&snapped), once);
    }
}
