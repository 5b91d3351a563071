//! Parameter covariance from a least-squares Jacobian.
//!
//! At the optimum of `minimize Σ r_i²` the covariance estimate is
//!
//! ```text
//! cov = (JᵀJ)⁺ · SSE / (n - p)
//! ```
//!
//! `(JᵀJ)⁺` is formed from the SVD of `J` (`V diag(1/s²) Vᵀ`) so that a
//! rank-deficient Jacobian yields a finite pseudo-inverse instead of a panic.
//! Singular values below `ε · max(n, p) · s_max` are discarded.
//! With no spare degrees of freedom (`n <= p`) every entry is `+∞`.

use nalgebra::{DMatrix, Matrix3};

/// Pseudo-inverse of `JᵀJ` for a tall `n × 3` Jacobian.
///
/// Returns `None` if the SVD produced non-finite values.
pub fn normal_pseudo_inverse(jacobian: &DMatrix<f64>) -> Option<Matrix3<f64>> {
    if jacobian.ncols() != 3 || jacobian.nrows() == 0 {
        return None;
    }
    if jacobian.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let svd = jacobian.clone().svd(false, true);
    let v_t = svd.v_t?;
    let s = &svd.singular_values;

    let s_max = s.iter().copied().fold(0.0_f64, f64::max);
    let threshold = f64::EPSILON * jacobian.nrows().max(jacobian.ncols()) as f64 * s_max;

    let mut out = Matrix3::<f64>::zeros();
    for k in 0..s.len() {
        let sk = s[k];
        if sk <= threshold {
            continue;
        }
        let inv = 1.0 / (sk * sk);
        for a in 0..3 {
            for b in 0..3 {
                out[(a, b)] += v_t[(k, a)] * v_t[(k, b)] * inv;
            }
        }
    }

    if out.iter().all(|v| v.is_finite()) {
        Some(out)
    } else {
        None
    }
}

/// Scaled covariance `(JᵀJ)⁺ · SSE / (n - p)`.
pub fn covariance_from_jacobian(jacobian: &DMatrix<f64>, sse: f64) -> Option<Matrix3<f64>> {
    let n = jacobian.nrows();
    let p = jacobian.ncols();
    if n <= p {
        return Some(Matrix3::from_element(f64::INFINITY));
    }
    let base = normal_pseudo_inverse(jacobian)?;
    Some(base * (sse / (n - p) as f64))
}

/// `sqrt` of the covariance diagonal.
pub fn standard_errors(covariance: &Matrix3<f64>) -> [f64; 3] {
    [
        covariance[(0, 0)].sqrt(),
        covariance[(1, 1)].sqrt(),
        covariance[(2, 2)].sqrt(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_inverse_matches_inverse_for_full_rank() {
        // Columns: 1, x, x² on x = 0..5.
        let xs: [f64; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];
        let j = DMatrix::from_fn(xs.len(), 3, |i, c| xs[i].powi(c as i32));
        let pinv = normal_pseudo_inverse(&j).unwrap();
        let jtj = j.transpose() * &j;
        let ident = Matrix3::from_iterator(jtj.iter().copied()) * pinv;
        for a in 0..3 {
            for b in 0..3 {
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((ident[(a, b)] - expected).abs() < 1e-8, "({a},{b}) = {}", ident[(a, b)]);
            }
        }
    }

    #[test]
    fn rank_deficient_jacobian_stays_finite() {
        // Second column duplicates the first.
        let j = DMatrix::from_fn(6, 3, |i, c| if c == 2 { i as f64 } else { 1.0 });
        let pinv = normal_pseudo_inverse(&j).unwrap();
        assert!(pinv.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn no_spare_dof_gives_infinite_covariance() {
        let j = DMatrix::from_fn(3, 3, |i, c| if i == c { 1.0 } else { 0.0 });
        let cov = covariance_from_jacobian(&j, 1.0).unwrap();
        assert!(cov.iter().all(|v| *v == f64::INFINITY));
    }

    #[test]
    fn zero_residual_gives_zero_errors() {
        let xs: [f64; 6] = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0];
        let j = DMatrix::from_fn(xs.len(), 3, |i, c| xs[i].powi(c as i32));
        let cov = covariance_from_jacobian(&j, 0.0).unwrap();
        let se = standard_errors(&cov);
        assert_eq!(se, [0.0, 0.0, 0.0]);
    }
}
