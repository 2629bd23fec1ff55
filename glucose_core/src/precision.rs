//! Fixed-precision rounding rules.
//!
//! Dosing math floors onto the 0.05 U pump grid; display and statistics
//! round half away from zero.

/// Steps per unit on the insulin pump dosing grid (0.05 U).
pub const BASAL_STEPS_PER_UNIT: f64 = 20.0;

/// Floor `n` onto the 0.05 grid.
///
/// Always truncates downward: `1.075` becomes `1.05`, never `1.10`.
/// The result is cleaned up to two decimals so grid values compare
/// exactly (`0.15`, not `0.15000000000000002`).
pub fn round_to_basal_precision(n: f64) -> f64 {
    let rounded = (n * BASAL_STEPS_PER_UNIT).floor();
    two_decimals(rounded / BASAL_STEPS_PER_UNIT)
}

/// Round half away from zero to one decimal place.
pub fn one_decimal(n: f64) -> f64 {
    round_to(n, 10.0)
}

/// Round half away from zero to two decimal places.
pub fn two_decimals(n: f64) -> f64 {
    round_to(n, 100.0)
}

fn round_to(n: f64, scale: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    let r = (n * scale).round() / scale;
    // Avoid "-0" leaking into output.
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
