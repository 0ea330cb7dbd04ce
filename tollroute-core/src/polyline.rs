//! Encoded polyline codec at 1e-5 precision.
//!
//! Each coordinate is stored as a signed delta from the previous one,
//! zig-zag encoded and split into 5-bit groups offset by 63 so every byte is
//! printable ASCII between `?` and `~`.

use thiserror::Error;

use crate::geometry::LatLng;

const PRECISION: f64 = 1e5;
const ALPHABET_START: u8 = b'?';
const ALPHABET_END: u8 = b'~';
const CONTINUATION: u64 = 0x20;
const GROUP_MASK: u64 = 0x1f;
const MAX_SHIFT: u32 = 60;

/// Errors raised by [`decode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended in the middle of a value.
    #[error("polyline truncated at byte {offset}")]
    Truncated {
        /// Byte offset where more input was expected.
        offset: usize,
    },
    /// A byte fell outside the `?`..`~` alphabet.
    #[error("invalid polyline byte {byte:#04x} at offset {offset}")]
    InvalidByte {
        /// Offending byte.
        byte: u8,
        /// Byte offset of the offending byte.
        offset: usize,
    },
    /// A latitude was not followed by a longitude.
    #[error("latitude at byte {offset} has no matching longitude")]
    UnpairedLatitude {
        /// Byte offset where the longitude should have started.
        offset: usize,
    },
    /// A value or running total exceeded the representable range.
    #[error("polyline value out of range at byte {offset}")]
    OutOfRange {
        /// Byte offset of the value.
        offset: usize,
    },
}

/// Decode an encoded polyline into an ordered list of positions.
///
/// An empty string decodes to an empty list.
///
/// # Examples
///
/// ```
/// use tollroute_core::polyline::decode;
///
/// let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").expect("valid polyline");
/// assert_eq!(points.len(), 3);
/// assert!((points[0].lat - 38.5).abs() < 1e-9);
/// assert!((points[0].lng + 120.2).abs() < 1e-9);
/// ```
///
/// # Errors
///
/// Returns [`DecodeError`] for truncated input, bytes outside the alphabet,
/// a dangling latitude, or values that overflow.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut offset = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while offset < bytes.len() {
        let d_lat = read_value(bytes, &mut offset)?;
        if offset >= bytes.len() {
            return Err(DecodeError::UnpairedLatitude { offset });
        }
        let d_lng = read_value(bytes, &mut offset)?;

        lat = lat
            .checked_add(d_lat)
            .ok_or(DecodeError::OutOfRange { offset })?;
        lng = lng
            .checked_add(d_lng)
            .ok_or(DecodeError::OutOfRange { offset })?;
        points.push(LatLng::new(to_degrees(lat, offset)?, to_degrees(lng, offset)?));
    }

    Ok(points)
}

/// Encode positions as a polyline string at 1e-5 precision.
#[must_use]
pub fn encode(points: &[LatLng]) -> String {
    let mut out = String::new();
    let mut previous = (0_i64, 0_i64);
    for point in points {
        let current = (to_units(point.lat), to_units(point.lng));
        write_value(current.0.saturating_sub(previous.0), &mut out);
        write_value(current.1.saturating_sub(previous.1), &mut out);
        previous = current;
    }
    out
}

fn read_value(bytes: &[u8], offset: &mut usize) -> Result<i64, DecodeError> {
    let start = *offset;
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let Some(&byte) = bytes.get(*offset) else {
            return Err(DecodeError::Truncated { offset: *offset });
        };
        if !(ALPHABET_START..=ALPHABET_END).contains(&byte) {
            return Err(DecodeError::InvalidByte {
                byte,
                offset: *offset,
            });
        }
        if shift > MAX_SHIFT {
            return Err(DecodeError::OutOfRange { offset: start });
        }
        let group = u64::from(byte - ALPHABET_START);
        result |= (group & GROUP_MASK) << shift;
        shift += 5;
        *offset += 1;
        if group < CONTINUATION {
            break;
        }
    }

    let magnitude = i64::try_from(result >> 1).map_err(|_| DecodeError::OutOfRange { offset: start })?;
    Ok(if result & 1 == 0 { magnitude } else { !magnitude })
}

fn write_value(delta: i64, out: &mut String) {
    let shifted = delta << 1;
    let zigzag = if delta < 0 { !shifted } else { shifted };
    let mut value = zigzag.cast_unsigned();
    while value >= CONTINUATION {
        push_group((value & GROUP_MASK) | CONTINUATION, out);
        value >>= 5;
    }
    push_group(value, out);
}

fn push_group(group: u64, out: &mut String) {
    if let Ok(byte) = u8::try_from(group) {
        out.push(char::from(byte + ALPHABET_START));
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "fixed-point units are scaled back to degrees"
)]
fn to_degrees(units: i64, offset: usize) -> Result<f64, DecodeError> {
    let value = i32::try_from(units).map_err(|_| DecodeError::OutOfRange { offset })?;
    Ok(f64::from(value) / PRECISION)
}

#[expect(
    clippy::float_arithmetic,
    reason = "degrees are scaled to fixed-point units"
)]
#[expect(
    clippy::cast_possible_truncation,
    reason = "coordinates are bounded well inside the i64 range"
)]
fn to_units(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}
