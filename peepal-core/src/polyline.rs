//! Encoded polyline format at five decimal places.

use crate::model::Coordinate;
use crate::ports::PortError;

const FACTOR: f64 = 1e5;

/// Encode a path as a polyline string.
#[must_use]
pub fn encode(path: &[Coordinate]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    let mut previous = (0_i64, 0_i64);

    for point in path {
        let current = (quantize(point.latitude), quantize(point.longitude));
        encode_value(current.0 - previous.0, &mut out);
        encode_value(current.1 - previous.1, &mut out);
        previous = current;
    }

    out
}

/// Decode a polyline string into a path.
///
/// # Errors
///
/// Returns [`PortError::Decode`] when the string is truncated or holds
/// characters outside the encoding alphabet.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PortError> {
    let mut bytes = encoded.bytes().peekable();
    let mut path = Vec::new();
    let mut latitude = 0_i64;
    let mut longitude = 0_i64;

    while bytes.peek().is_some() {
        latitude += decode_value(&mut bytes)?;
        longitude += decode_value(&mut bytes)?;
        path.push(Coordinate {
            latitude: dequantize(latitude),
            longitude: dequantize(longitude),
        });
    }

    Ok(path)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "degrees times 1e5 fits comfortably in i64"
)]
fn quantize(degrees: f64) -> i64 {
    (degrees * FACTOR).round() as i64
}

#[expect(clippy::cast_precision_loss, reason = "values stay below 2^53")]
fn dequantize(value: i64) -> f64 {
    value as f64 / FACTOR
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = ((delta << 1) ^ (delta >> 63)).unsigned_abs();
    while value >= 0x20 {
        push_chunk((value & 0x1f) | 0x20, out);
        value >>= 5;
    }
    push_chunk(value, out);
}

fn push_chunk(chunk: u64, out: &mut String) {
    if let Some(ch) = u32::try_from(chunk + 63).ok().and_then(char::from_u32) {
        out.push(ch);
    }
}

fn decode_value<I>(bytes: &mut I) -> Result<i64, PortError>
where
    I: Iterator<Item = u8>,
{
    let mut result = 0_i64;
    let mut shift = 0_u32;

    loop {
        let byte = bytes
            .next()
            .ok_or_else(|| PortError::Decode("truncated polyline".to_owned()))?;
        if !(63..=126).contains(&byte) {
            return Err(PortError::Decode(format!(
                "invalid polyline character {:?}",
                char::from(byte)
            )));
        }
        if shift > 60 {
            return Err(PortError::Decode("polyline value overflows".to_owned()));
        }
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}
