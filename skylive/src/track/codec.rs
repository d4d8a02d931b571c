//! Delta encoding for published tracks.
//!
//! Published snapshots carry tracks as arrays of small signed integers:
//! the first element is the absolute value, every following element is
//! the difference to its predecessor. Combined with varint/zigzag wire
//! encoding this keeps a track of hundreds of fixes within a few hundred
//! bytes. Coordinates are scaled to 1e-5 degrees (about 1 m) before
//! encoding.

/// Coordinate scale: 1e-5 degrees per unit.
const COORD_SCALE: f64 = 1e5;

/// Scales a coordinate in degrees to encoding units.
pub fn scale_coord(deg: f64) -> i32 {
    (deg * COORD_SCALE).round() as i32
}

/// Restores a coordinate in degrees from encoding units.
pub fn unscale_coord(value: i32) -> f64 {
    f64::from(value) / COORD_SCALE
}

/// Delta-encodes a sequence: first element absolute, rest differences.
pub fn delta_encode(values: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0i32;
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            out.push(v);
        } else {
            out.push(v.wrapping_sub(prev));
        }
        prev = v;
    }
    out
}

/// Inverse of [`delta_encode`].
pub fn delta_decode(deltas: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut acc = 0i32;
    for (i, &d) in deltas.iter().enumerate() {
        acc = if i == 0 { d } else { acc.wrapping_add(d) };
        out.push(acc);
    }
    out
}
