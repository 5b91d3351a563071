//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a fitted trial:
//! - parameters, standard errors and covariance
//! - fit quality
//! - a precomputed model grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{CurveGrid, FitFile, FitResult, Trial};
use crate::error::AppError;
use crate::models::BerModel;

const GRID_POINTS: usize = 101;

/// Build the portable representation of a fit.
pub fn fit_file(trial: &Trial, fit: &FitResult) -> FitFile {
    let (t0, t1) = trial.time_range().unwrap_or((0.0, 1.0));
    let (t, y): (Vec<f64>, Vec<f64>) = BerModel::sample_curve(&fit.params, t0, t1, GRID_POINTS)
        .into_iter()
        .unzip();

    let mut covariance = [[None; 3]; 3];
    for (a, row) in covariance.iter_mut().enumerate() {
        for (b, cell) in row.iter_mut().enumerate() {
            *cell = finite(fit.covariance[(a, b)]);
        }
    }

    FitFile {
        tool: "tdfit".to_string(),
        label: trial.label.clone(),
        params: fit.params,
        std_errors: fit.std_errors.map(finite),
        covariance,
        quality: fit.quality.clone(),
        grid: CurveGrid { t, y },
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, trial: &Trial, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &fit_file(trial, fit))
        .map_err(|e| AppError::input(format!("Failed to write fit JSON: {e}")))?;
    log::info!("wrote fit for '{}' to {}", trial.label, path.display());
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid fit JSON: {e}")))
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
