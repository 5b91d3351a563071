//! Truncated power series for the thermal-wave model.
//!
//! Two series are evaluated here:
//!
//! - `series_bessel`: `Σ_{i<50} A (-1)^i / (i!)² · (x² / 4f)^i`, a fixed-length
//!   reference curve.
//! - `ber_series`: `Σ_{i<10} cos(iπ/2) / (i!)² · u^i`, the Kelvin `ber` component
//!   used as the fitted model with `u = x² f`.
//!
//! Neither series checks convergence. Large arguments overflow to `inf`/`NaN` and
//! that value propagates to the caller unchanged.

/// Number of terms summed by `series_bessel`.
pub const BESSEL_TERMS: usize = 50;

/// Number of terms summed by `ber_series` (indices `0..=9`).
pub const BER_TERMS: usize = 10;

/// `cos(iπ/2)` taken exactly: the cycle `1, 0, -1, 0`.
///
/// Odd indices contribute nothing; even indices alternate in sign.
pub fn quarter_turn_cos(i: usize) -> f64 {
    match i % 4 {
        0 => 1.0,
        2 => -1.0,
        _ => 0.0,
    }
}

/// `(i!)²` as a float. Exact for the small `i` used here.
fn factorial_squared(i: usize) -> f64 {
    let f = (1..=i).fold(1.0_f64, |acc, k| acc * k as f64);
    f * f
}

/// Coefficients `cos(iπ/2) / (i!)²` of the ber series.
pub fn ber_coefficients() -> [f64; BER_TERMS] {
    let mut out = [0.0; BER_TERMS];
    for (i, c) in out.iter_mut().enumerate() {
        *c = quarter_turn_cos(i) / factorial_squared(i);
    }
    out
}

/// Reference Bessel series `A · Σ_{i<50} (-1)^i / (i!)² · (x² / 4f)^i`.
pub fn series_bessel(x: f64, amplitude: f64, f: f64) -> f64 {
    let q = (x * x) / (4.0 * f);
    let mut sum = 0.0;
    for i in 0..BESSEL_TERMS {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        sum += amplitude * (sign / factorial_squared(i)) * q.powi(i as i32);
    }
    sum
}

/// The ber series `Σ_{i<10} cos(iπ/2) / (i!)² · u^i`.
pub fn ber_series(u: f64) -> f64 {
    ber_coefficients()
        .iter()
        .enumerate()
        .map(|(i, c)| c * u.powi(i as i32))
        .sum()
}

/// `d/du` of `ber_series`.
pub fn ber_series_derivative(u: f64) -> f64 {
    ber_coefficients()
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| c * i as f64 * u.powi(i as i32 - 1))
        .sum()
}

/// Model curve `A · ber(x² f) + offset`.
///
/// Amplitude and offset are applied after summation.
pub fn ber0(x: f64, amplitude: f64, f: f64, offset: f64) -> f64 {
    amplitude * ber_series(x * x * f) + offset
}
