//! Nonlinear least-squares fit of the ber₀ model to one trial.
//!
//! Given:
//! - sample times `t_i`
//! - observed internal temperatures `y_i`
//! - an initial guess `(A, f, offset)` (or the fitter's default `(1, 1, 1)`)
//!
//! we minimize `Σ (ber₀(t_i) - y_i)²` with Levenberg–Marquardt and report the
//! fitted parameters together with their covariance.
//!
//! The optimizer is the `levenberg-marquardt` crate (MINPACK port). The driver
//! performs no retries and no alternative seeding: a failed minimization is
//! returned as an error.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn, Matrix3, OMatrix, U3, Vector3};

use crate::domain::{FitParameters, FitQuality, FitResult, Trial};
use crate::error::AppError;
use crate::math::{covariance_from_jacobian, standard_errors};
use crate::models::BerModel;

/// Optimizer settings.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Evaluation budget multiplier: at most `patience * (p + 1)` residual evaluations.
    pub patience: usize,
    /// Relative tolerance on the reduction of the sum of squares.
    pub ftol: f64,
    /// Relative tolerance on the parameter step.
    pub xtol: f64,
    /// Orthogonality tolerance between residuals and Jacobian columns.
    pub gtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            patience: 200,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
        }
    }
}

/// Least-squares problem: residuals `ber₀(t_i) - y_i` over the parameters `(A, f, offset)`.
struct BerProblem<'a> {
    t: &'a [f64],
    y: &'a [f64],
    params: Vector3<f64>,
}

impl BerProblem<'_> {
    fn current(&self) -> FitParameters {
        FitParameters::from(self.params)
    }

    fn residual_values(&self) -> Option<Vec<f64>> {
        let p = self.current();
        let out: Vec<f64> = self
            .t
            .iter()
            .zip(self.y.iter())
            .map(|(&t, &y)| BerModel::predict(t, &p) - y)
            .collect();
        out.iter().all(|r| r.is_finite()).then_some(out)
    }

    fn jacobian_rows(&self) -> Option<Vec<[f64; 3]>> {
        let p = self.current();
        let mut rows = Vec::with_capacity(self.t.len());
        let mut row = [0.0; 3];
        for &t in self.t {
            BerModel::fill_jacobian_row(t, &p, &mut row);
            if row.iter().any(|v| !v.is_finite()) {
                return None;
            }
            rows.push(row);
        }
        Some(rows)
    }
}

impl LeastSquaresProblem<f64, Dyn, U3> for BerProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U3>;
    type ParameterStorage = Owned<f64, U3>;

    fn set_params(&mut self, x: &Vector3<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> Vector3<f64> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let values = self.residual_values()?;
        Some(DVector::from_vec(values))
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U3>> {
        let rows = self.jacobian_rows()?;
        Some(OMatrix::<f64, Dyn, U3>::from_fn_generic(
            Dyn(rows.len()),
            U3,
            |i, j| rows[i][j],
        ))
    }
}

/// Fit `BerModel` to the trial's internal temperature.
pub fn fit_trial(
    trial: &Trial,
    guess: Option<FitParameters>,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    fit_curve(&trial.t, &trial.t_internal, guess, opts).map_err(|e| {
        AppError::new(
            e.exit_code(),
            format!("Trial '{}': {}", trial.label, e.message()),
        )
    })
}

/// Fit `BerModel` to arbitrary `(x, y)` samples.
///
/// With `guess = None` the fit starts from `(1, 1, 1)`.
pub fn fit_curve(
    x: &[f64],
    y: &[f64],
    guess: Option<FitParameters>,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    let p = BerModel::PARAM_COUNT;
    let n = x.len();

    if n != y.len() {
        return Err(AppError::data(format!(
            "x and y lengths differ ({n} vs {}).",
            y.len()
        )));
    }
    if n < p {
        return Err(AppError::data(format!(
            "Need at least {p} samples to fit {p} parameters, got {n}."
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::data("Input data contains non-finite values."));
    }

    let seed = guess.unwrap_or_else(FitParameters::unit);
    if !seed.is_finite() {
        return Err(AppError::data(format!("Initial guess is not finite: {seed:?}.")));
    }

    let problem = BerProblem {
        t: x,
        y,
        params: seed.into(),
    };

    let (problem, report) = LevenbergMarquardt::new()
        .with_patience(opts.patience)
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .minimize(problem);

    if !report.termination.was_successful() {
        return Err(AppError::numeric(format!(
            "Optimal parameters not found from seed {:?}: {:?} after {} evaluations.",
            seed.to_array(),
            report.termination,
            report.number_of_evaluations
        )));
    }

    let params = problem.current();
    let residuals = problem
        .residual_values()
        .ok_or_else(|| AppError::numeric("Non-finite residuals at the fitted parameters."))?;
    let sse: f64 = residuals.iter().map(|r| r * r).sum();

    let covariance = match problem.jacobian_rows() {
        Some(rows) => {
            let j = DMatrix::from_fn(rows.len(), p, |i, c| rows[i][c]);
            covariance_from_jacobian(&j, sse)
        }
        None => None,
    }
    .unwrap_or_else(|| {
        log::warn!("Covariance of the parameters could not be estimated.");
        Matrix3::from_element(f64::INFINITY)
    });

    let std_errors = standard_errors(&covariance);
    let rmse = (sse / n as f64).sqrt();

    log::debug!(
        "fit: seed={:?} -> A={:.6}, f={:.6}, offset={:.6} (sse={sse:.3e}, evals={}, {:?})",
        seed.to_array(),
        params.amplitude,
        params.frequency,
        params.offset,
        report.number_of_evaluations,
        report.termination
    );

    Ok(FitResult {
        params,
        covariance,
        std_errors,
        quality: FitQuality {
            sse,
            rmse,
            n,
            evaluations: report.number_of_evaluations,
        },
        termination: format!("{:?}", report.termination),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(params: FitParameters, n: usize, t_max: f64) -> Trial {
        let t: Vec<f64> = (0..n).map(|i| t_max * i as f64 / (n as f64 - 1.0)).collect();
        let y: Vec<f64> = t.iter().map(|&ti| BerModel::predict(ti, &params)).collect();
        Trial::new("synthetic", t, y.clone(), y).unwrap()
    }

    #[test]
    fn recovers_parameters_from_noiseless_data() {
        let truth = FitParameters::new(3.0, 1.0, 25.0);
        let trial = synthetic(truth, 41, 2.0);
        let seed = FitParameters::new(2.7, 0.9, 24.0);

        let fit = fit_trial(&trial, Some(seed), &FitOptions::default()).unwrap();
        assert!((fit.params.amplitude - truth.amplitude).abs() < 1e-3, "{:?}", fit.params);
        assert!((fit.params.frequency - truth.frequency).abs() < 1e-3, "{:?}", fit.params);
        assert!((fit.params.offset - truth.offset).abs() < 1e-3, "{:?}", fit.params);
    }

    #[test]
    fn self_fit_has_near_zero_residual() {
        let truth = FitParameters::new(-1.5, 0.8, 40.0);
        let trial = synthetic(truth, 30, 2.0);
        let seed = FitParameters::new(-1.4, 0.75, 39.5);

        let fit = fit_trial(&trial, Some(seed), &FitOptions::default()).unwrap();
        assert!(fit.quality.sse < 1e-12, "sse = {}", fit.quality.sse);
        assert!(fit.quality.rmse < 1e-6);
        assert!(fit.std_errors.iter().all(|e| e.is_finite() && *e < 1e-4));
    }

    #[test]
    fn default_seed_is_unit() {
        let trial = synthetic(FitParameters::unit(), 20, 1.5);
        let fit = fit_trial(&trial, None, &FitOptions::default()).unwrap();
        for (a, b) in fit.params.to_array().iter().zip([1.0, 1.0, 1.0]) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_too_few_samples() {
        let err = fit_curve(&[0.0, 1.0], &[1.0, 2.0], None, &FitOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
    }

    #[test]
    fn rejects_non_finite_input() {
        let x = [0.0, 0.5, 1.0, 1.5];
        let y = [1.0, f64::NAN, 2.0, 3.0];
        let err = fit_curve(&x, &y, None, &FitOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
    }

    #[test]
    fn rejects_non_finite_seed() {
        let trial = synthetic(FitParameters::unit(), 10, 1.0);
        let seed = FitParameters::new(f64::INFINITY, 1.0, 1.0);
        let err = fit_trial(&trial, Some(seed), &FitOptions::default()).unwrap_err();
        assert!(err.message().contains("synthetic"));
    }
}
