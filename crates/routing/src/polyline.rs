// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Decoding of the encoded polyline format used for route geometry.
//!
//! Each coordinate is stored as a pair of zig-zag encoded deltas from the
//! previous point, split into 5-bit chunks and offset into printable ASCII.

use crate::error::RoutingError;
use fieldops_domain::Coordinate;

/// Five decimal places, the precision OpenRouteService encodes with.
pub const PRECISION: f64 = 1e5;

const CHUNK_BITS: u32 = 5;
const CONTINUATION: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;
const OFFSET: u8 = 63;

/// Decodes an encoded polyline into coordinates.
///
/// # Errors
///
/// Returns `RoutingError::Polyline` for characters outside the encoding
/// alphabet, a value cut off mid-way, or a latitude with no longitude, and
/// `RoutingError::Coordinate` if a decoded point is out of range.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, RoutingError> {
    let mut bytes = encoded.bytes();
    let mut coordinates: Vec<Coordinate> = Vec::new();
    let mut latitude: i32 = 0;
    let mut longitude: i32 = 0;

    while let Some(delta_latitude) = next_value(&mut bytes)? {
        let delta_longitude: i32 = next_value(&mut bytes)?
            .ok_or_else(|| RoutingError::Polyline(String::from("latitude without longitude")))?;
        latitude = accumulate(latitude, delta_latitude)?;
        longitude = accumulate(longitude, delta_longitude)?;
        coordinates.push(Coordinate::new(
            f64::from(latitude) / PRECISION,
            f64::from(longitude) / PRECISION,
        )?);
    }

    Ok(coordinates)
}

fn accumulate(total: i32, delta: i32) -> Result<i32, RoutingError> {
    total
        .checked_add(delta)
        .ok_or_else(|| RoutingError::Polyline(String::from("coordinate overflow")))
}

/// Reads one zig-zag value. `None` means the input ended cleanly.
fn next_value(bytes: &mut impl Iterator<Item = u8>) -> Result<Option<i32>, RoutingError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(byte) = bytes.next() else {
            if shift == 0 {
                return Ok(None);
            }
            return Err(RoutingError::Polyline(String::from("truncated value")));
        };
        if !(OFFSET..=126).contains(&byte) {
            return Err(RoutingError::Polyline(format!(
                "unexpected character {:?}",
                char::from(byte)
            )));
        }
        if shift > 30 {
            return Err(RoutingError::Polyline(String::from("value too long")));
        }

        let chunk: i64 = i64::from(byte - OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        if chunk < CONTINUATION {
            break;
        }
    }

    let value: i64 = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };
    i32::try_from(value)
        .map(Some)
        .map_err(|_| RoutingError::Polyline(String::from("value out of range")))
}
