// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-point power-series evaluation.
//!
//! All operands share one binary radix point: a value `v` with `radix_bits = q` represents
//! `v / 2^q`. The correction paths use Q30 with 32-bit terms and 64-bit intermediates.
//!
//! Works in `no_std` and does not allocate memory.

use micromath::F32Ext;

/// Radix used by every correction polynomial on the node.
pub const Q30: u32 = 30;

/// Evaluate `Σ coeffs[i] * x^i` in fixed point.
///
/// `x`, every coefficient and the result share the `radix_bits` radix point.
///
/// - `x^0` is `1 << radix_bits`.
/// - Each higher power is the previous power times `x` in 64 bits, shifted right by
///   `radix_bits` to return to the input scale before the next multiplication.
/// - Each term is `power * coeff` in 64 bits, shifted right by `radix_bits`, then added into the
///   32-bit running sum.
///
/// There is no overflow detection. Callers pick `radix_bits` (< 32) and coefficient magnitudes
/// so that the 64-bit intermediates never exceed their width; out-of-range inputs wrap.
pub fn evaluate(x: i32, radix_bits: u32, coeffs: &[i32]) -> i32 {
    let mut power = (1i64 << radix_bits) as i32;
    let mut sum: i32 = 0;

    for (i, &coeff) in coeffs.iter().enumerate() {
        if i > 0 {
            power = ((power as i64 * x as i64) >> radix_bits) as i32;
        }

        let term = ((power as i64 * coeff as i64) >> radix_bits) as i32;
        sum = sum.wrapping_add(term);
    }

    sum
}

/// Convert a real value into fixed point, rounding to nearest.
///
/// Values outside the representable range saturate.
pub fn from_f32(value: f32, radix_bits: u32) -> i32 {
    let scale = (1u64 << radix_bits) as f32;
    F32Ext::round(value * scale) as i32
}

/// Convert a fixed-point value back into a real value.
pub fn to_f32(value: i32, radix_bits: u32) -> f32 {
    value as f32 / (1u64 << radix_bits) as f32
}
