//! [Google's polyline algorithm](https://developers.google.com/maps/documentation/utilities/polylinealgorithm),
//! used to fit a track into a static map request URL.
//!
//! Coordinates are rounded to 5 decimal places, latitude is written before
//! longitude, and each value is delta-encoded against the previous point.
//! Only WGS84 coordinates are encoded, so every delta fits the chunk writer.

use std::str::Chars;

use thiserror::Error;

use crate::track::Point;

const PRECISION: f64 = 1e5;

#[derive(Debug, Error, PartialEq)]
pub enum PolylineError {
    #[error("coordinate ({lon}, {lat}) is not a valid longitude/latitude")]
    OutOfRange { lon: f64, lat: f64 },

    #[error("invalid character {ch:?} at offset {offset}")]
    InvalidChar { offset: usize, ch: char },

    #[error("polyline ends in the middle of a value")]
    Truncated,

    #[error("encoded value does not fit in 64 bits")]
    Overflow,
}

/// Encodes points; an empty slice gives an empty string.
///
/// Fails on a non-finite coordinate, a longitude outside ±180 or a latitude
/// outside ±90.
pub fn encode(points: &[Point]) -> Result<String, PolylineError> {
    encode_iter(points.iter().map(|p| (p.lon, p.lat)))
}

/// Same as [`encode`] for raw `[lon, lat]` pairs.
pub fn encode_lon_lat(coords: &[[f64; 2]]) -> Result<String, PolylineError> {
    encode_iter(coords.iter().map(|&[lon, lat]| (lon, lat)))
}

fn encode_iter(coords: impl Iterator<Item = (f64, f64)>) -> Result<String, PolylineError> {
    let mut out = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for (lon, lat) in coords {
        if !(lon.is_finite() && lat.is_finite() && lon.abs() <= 180.0 && lat.abs() <= 90.0) {
            return Err(PolylineError::OutOfRange { lon, lat });
        }
        let lat = scaled(lat);
        let lon = scaled(lon);
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    Ok(out)
}

fn scaled(value: f64) -> i64 {
    (value * PRECISION).round() as i64
}

/// Zig-zag the value, then write it as 5-bit chunks, least significant first.
fn encode_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= 0x20 {
        out.push(char::from(((0x20 | (value & 0x1f)) + 63) as u8));
        value >>= 5;
    }
    out.push(char::from((value + 63) as u8));
}

/// Decodes a polyline back into points (without elevation).
pub fn decode(encoded: &str) -> Result<Vec<Point>, PolylineError> {
    let mut chars = encoded.chars();
    let mut offset = 0usize;
    let mut lat = 0i64;
    let mut lon = 0i64;
    let mut points = Vec::new();

    while let Some(d_lat) = decode_value(&mut chars, &mut offset)? {
        let d_lon = decode_value(&mut chars, &mut offset)?.ok_or(PolylineError::Truncated)?;
        lat = lat.checked_add(d_lat).ok_or(PolylineError::Overflow)?;
        lon = lon.checked_add(d_lon).ok_or(PolylineError::Overflow)?;
        points.push(Point::new(lon as f64 / PRECISION, lat as f64 / PRECISION));
    }

    Ok(points)
}

/// Reads one signed value; `Ok(None)` at a clean end of input.
fn decode_value(chars: &mut Chars<'_>, offset: &mut usize) -> Result<Option<i64>, PolylineError> {
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let Some(ch) = chars.next() else {
            return if shift == 0 {
                Ok(None)
            } else {
                Err(PolylineError::Truncated)
            };
        };
        let digit = match ch as u32 {
            c @ 63..=126 => u64::from(c - 63),
            _ => return Err(PolylineError::InvalidChar { offset: *offset, ch }),
        };
        *offset += 1;

        let chunk = digit & 0x1f;
        // the chunk at shift 60 has room for 4 bits only
        if shift > 60 || (shift == 60 && chunk > 0xf) {
            return Err(PolylineError::Overflow);
        }
        result |= chunk << shift;
        shift += 5;

        if digit & 0x20 == 0 {
            let value = (result >> 1) as i64;
            return Ok(Some(if result & 1 == 1 { !value } else { value }));
        }
    }
}

/// Keep every Nth item so that at most about `threshold` remain.
///
/// N = ceil(len / threshold); the first item is always kept.
pub fn subsample<T: Copy>(items: &[T], threshold: usize) -> Vec<T> {
    if threshold == 0 || items.len() <= threshold {
        return items.to_vec();
    }
    let step = items.len().div_ceil(threshold);
    items.iter().step_by(step).copied().collect()
}
