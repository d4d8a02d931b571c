//! Polyline delta codec used by the SkyLines wire format.
//!
//! Values are scaled, delta-encoded per dimension, zigzag-mapped and
//! written as 5-bit groups offset by 63 - the classic encoded-polyline
//! algorithm, generalized to n-dimensional interleaved sequences.

/// Decodes an encoded string into `stride`-dimensional interleaved
/// values, dividing by `factor`.
///
/// Each dimension accumulates its own deltas, so interleaved lat/lon
/// pairs decode with `stride == 2`. Trailing incomplete groups are
/// ignored.
pub fn decode_deltas(encoded: &str, stride: usize, factor: f64) -> Vec<f64> {
    let raw = decode_signed(encoded);
    let mut out = Vec::with_capacity(raw.len());
    let mut acc = vec![0i64; stride.max(1)];
    for (i, delta) in raw.iter().enumerate() {
        let dim = i % stride.max(1);
        acc[dim] += delta;
        out.push(acc[dim] as f64 / factor);
    }
    out
}

/// Inverse of [`decode_deltas`].
pub fn encode_deltas(values: &[f64], stride: usize, factor: f64) -> String {
    let stride = stride.max(1);
    let mut prev = vec![0i64; stride];
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        let dim = i % stride;
        let scaled = (value * factor).round() as i64;
        encode_signed(scaled - prev[dim], &mut out);
        prev[dim] = scaled;
    }
    out
}

fn decode_signed(encoded: &str) -> Vec<i64> {
    let mut out = Vec::new();
    let mut current = 0i64;
    let mut shift = 0u32;
    for byte in encoded.bytes() {
        let chunk = i64::from(byte) - 63;
        current |= (chunk & 0x1f) << shift;
        if chunk & 0x20 != 0 {
            shift += 5;
        } else {
            out.push(if current & 1 != 0 {
                !(current >> 1)
            } else {
                current >> 1
            });
            current = 0;
            shift = 0;
        }
    }
    out
}

fn encode_signed(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(((0x20 | (value & 0x1f)) + 63) as u8 as char);
        value >>= 5;
    }
    out.push((value + 63) as u8 as char);
}
