//! Reporting utilities: per-sample residuals, outlier rankings and formatted
//! terminal output.

use crate::domain::{FitResult, Trial};
use crate::error::AppError;
use crate::models::BerModel;

mod format;

pub use format::*;

/// One sample with its fitted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResidual {
    pub index: usize,
    pub t: f64,
    pub observed: f64,
    pub fitted: f64,
    /// `observed - fitted`.
    pub residual: f64,
}

/// Largest residuals on each side of the fitted curve.
#[derive(Debug, Clone, Default)]
pub struct Outliers {
    /// Samples above the curve, largest first.
    pub above: Vec<SampleResidual>,
    /// Samples below the curve, most negative first.
    pub below: Vec<SampleResidual>,
}

/// Compute fitted values and residuals of `T_I` for every sample.
pub fn compute_residuals(trial: &Trial, fit: &FitResult) -> Result<Vec<SampleResidual>, AppError> {
    let mut out = Vec::with_capacity(trial.len());
    for (index, (&t, &observed)) in trial.t.iter().zip(&trial.t_internal).enumerate() {
        let fitted = BerModel::predict(t, &fit.params);
        if !fitted.is_finite() {
            return Err(AppError::numeric(format!(
                "Non-finite model prediction at t={t} for trial '{}'.",
                trial.label
            )));
        }
        out.push(SampleResidual {
            index,
            t,
            observed,
            fitted,
            residual: observed - fitted,
        });
    }
    Ok(out)
}

/// The `top_n` largest positive and negative residuals.
pub fn rank_outliers(residuals: &[SampleResidual], top_n: usize) -> Outliers {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));
    let above = sorted
        .iter()
        .filter(|r| r.residual > 0.0)
        .take(top_n)
        .copied()
        .collect();
    let below = sorted
        .iter()
        .rev()
        .filter(|r| r.residual < 0.0)
        .take(top_n)
        .copied()
        .collect();
    Outliers { above, below }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParameters, FitQuality};
    use nalgebra::Matrix3;

    fn flat_fit(offset: f64) -> FitResult {
        FitResult {
            // amplitude 0 makes the model constant
            params: FitParameters::new(0.0, 1.0, offset),
            covariance: Matrix3::zeros(),
            std_errors: [0.0; 3],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                n: 0,
                evaluations: 0,
            },
            termination: "test".to_string(),
        }
    }

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let trial = Trial::new("x", vec![0.0, 1.0, 2.0], vec![50.0, 52.0, 47.0], vec![0.0; 3]).unwrap();
        let r = compute_residuals(&trial, &flat_fit(50.0)).unwrap();
        let values: Vec<f64> = r.iter().map(|s| s.residual).collect();
        assert_eq!(values, vec![0.0, 2.0, -3.0]);
        assert_eq!(r[2].fitted, 50.0);
    }

    #[test]
    fn outliers_split_by_sign() {
        let trial = Trial::new(
            "x",
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![51.0, 55.0, 45.0, 50.0, 48.0],
            vec![0.0; 5],
        )
        .unwrap();
        let r = compute_residuals(&trial, &flat_fit(50.0)).unwrap();
        let outliers = rank_outliers(&r, 1);
        assert_eq!(outliers.above.len(), 1);
        assert_eq!(outliers.above[0].index, 1);
        assert_eq!(outliers.below.len(), 1);
        assert_eq!(outliers.below[0].index, 2);

        let all = rank_outliers(&r, 10);
        assert_eq!(all.above.len(), 2);
        assert_eq!(all.below.len(), 2);
    }
}
