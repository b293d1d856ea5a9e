//! Signed fixed-point encoding with a decimal scale.
//!
//! A real `x` is stored as a sign bit plus an unsigned magnitude
//! `round(|x| * 10^scale)`. The product is computed in f64 and rounded half
//! to even. Magnitudes must match the reference exporter bit for bit.

use crate::error::{Error, Result};

/// 2^64. Scaled values at or above this do not fit in a u64.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Exactly representable powers of ten (10^22 is the largest).
const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Sign/magnitude pair. `sign` is 1 for negative inputs, including -0.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    pub sign: u8,
    pub magnitude: u64,
}

impl FixedPoint {
    pub const ZERO: Self = Self {
        sign: 0,
        magnitude: 0,
    };

    pub fn is_negative(self) -> bool {
        self.sign == 1
    }
}

/// The correctly rounded f64 value of 10^scale.
pub fn pow10(scale: u32) -> f64 {
    match POW10.get(scale as usize) {
        Some(p) => *p,
        // Parsing gives the correctly rounded double (or inf past 1e308).
        None => format!("1e{}", scale).parse().unwrap_or(f64::INFINITY),
    }
}

/// Encode a real number at the given decimal scale.
pub fn encode(x: f64, scale: u32) -> Result<FixedPoint> {
    if !x.is_finite() {
        return Err(Error::InvalidValue {
            value: x,
            location: None,
        });
    }
    let sign = u8::from(x.is_sign_negative());
    let abs = x.abs();
    let scaled = if abs == 0.0 {
        0.0
    } else {
        (abs * pow10(scale)).round_ties_even()
    };
    if scaled >= U64_LIMIT {
        return Err(Error::MagnitudeOverflow {
            value: x,
            scale,
            location: None,
        });
    }
    Ok(FixedPoint {
        sign,
        magnitude: scaled as u64,
    })
}

/// Encode a single-precision value. The widening to f64 is exact.
pub fn encode_f32(x: f32, scale: u32) -> Result<FixedPoint> {
    encode(f64::from(x), scale)
}

/// Decode back to f64. Lossy for magnitudes above 2^53.
pub fn decode(v: FixedPoint, scale: u32) -> f64 {
    let abs = v.magnitude as f64 / pow10(scale);
    if v.is_negative() {
        -abs
    } else {
        abs
    }
}
