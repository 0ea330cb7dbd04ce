//! Geocoding adapters: Google for addresses, Nominatim for coordinates.

mod google;
mod nominatim;

pub use google::{GOOGLE_MAPS_API, GoogleConfig, GoogleGeocoder};
pub use nominatim::{NOMINATIM_API, NominatimConfig, NominatimReverseGeocoder};

use tollroute_core::GeocodeError;

/// Describe a transport failure as a provider error.
fn provider_error(service: &str, error: &reqwest::Error) -> GeocodeError {
    let message = if error.is_timeout() {
        format!("{service} timed out")
    } else if let Some(status) = error.status() {
        format!("{service} returned HTTP {}", status.as_u16())
    } else {
        format!("{service} unreachable: {error}")
    };
    GeocodeError::Provider { message }
}
