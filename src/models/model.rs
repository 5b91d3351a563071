//! The ber₀ thermal-wave model.
//!
//! The fitter relies on two primitive operations:
//! - predict `T_I(t)` given `(A, f, offset)` (for residuals/plots)
//! - fill one Jacobian row `∂T/∂(A, f, offset)` at time `t` (for the optimizer)

use crate::domain::FitParameters;
use crate::math::{ber_series, ber_series_derivative};

/// `T(t) = A · ber(t² f) + offset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BerModel;

impl BerModel {
    /// Number of free parameters.
    pub const PARAM_COUNT: usize = 3;

    pub fn predict(t: f64, params: &FitParameters) -> f64 {
        params.amplitude * ber_series(t * t * params.frequency) + params.offset
    }

    /// Fill `∂T/∂A`, `∂T/∂f`, `∂T/∂offset` at `t`.
    pub fn fill_jacobian_row(t: f64, params: &FitParameters, out: &mut [f64; 3]) {
        let t2 = t * t;
        let u = t2 * params.frequency;
        out[0] = ber_series(u);
        out[1] = params.amplitude * t2 * ber_series_derivative(u);
        out[2] = 1.0;
    }

    /// Evaluate the model on `n` evenly spaced times in `[t_min, t_max]`.
    pub fn sample_curve(params: &FitParameters, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
        let n = n.max(2);
        (0..n)
            .map(|i| {
                let u = i as f64 / (n as f64 - 1.0);
                let t = t_min + u * (t_max - t_min);
                (t, Self::predict(t, params))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ber0;

    #[test]
    fn predict_matches_free_function() {
        let p = FitParameters::new(1.0, 20.0, 50.0);
        for &t in &[0.0, 0.1, 0.3, 0.5] {
            assert_eq!(BerModel::predict(t, &p), ber0(t, 1.0, 20.0, 50.0));
        }
    }

    #[test]
    fn jacobian_matches_finite_difference() {
        let p = FitParameters::new(3.0, 1.2, 25.0);
        let t = 1.1;
        let mut row = [0.0; 3];
        BerModel::fill_jacobian_row(t, &p, &mut row);

        let h = 1e-6;
        let base = p.to_array();
        for k in 0..3 {
            let mut hi = base;
            let mut lo = base;
            hi[k] += h;
            lo[k] -= h;
            let fd = (BerModel::predict(t, &hi.into()) - BerModel::predict(t, &lo.into())) / (2.0 * h);
            assert!((fd - row[k]).abs() < 1e-5, "k={k}: fd={fd}, analytic={}", row[k]);
        }
    }

    #[test]
    fn sample_curve_includes_endpoints() {
        let p = FitParameters::new(1.0, 1.0, 0.0);
        let curve = BerModel::sample_curve(&p, 0.0, 2.0, 5);
        assert_eq!(curve.len(), 5);
        assert_eq!(curve[0].0, 0.0);
        assert!((curve[4].0 - 2.0).abs() < 1e-12);
        assert_eq!(curve[0].1, 1.0);
    }
}
