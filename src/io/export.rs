//! Export per-sample fit results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use crate::domain::{FitResult, Trial, TrialRow};
use crate::error::AppError;
use crate::io::ingest::REQUIRED_COLUMNS;
use crate::models::BerModel;

/// Write raw rows in the trial input schema (readable by `load_trial`).
pub fn write_trial_csv(path: &Path, rows: &[TrialRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create trial CSV '{}': {e}", path.display())))?;

    writer
        .write_record(REQUIRED_COLUMNS)
        .map_err(|e| AppError::input(format!("Failed to write trial CSV header: {e}")))?;
    for row in rows {
        writer
            .write_record([
                format!("{}", row.t),
                format!("{}", row.t_internal),
                format!("{}", row.t_hot),
                format!("{}", row.t_cold),
                row.flag.code().to_string(),
            ])
            .map_err(|e| AppError::input(format!("Failed to write trial CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush trial CSV: {e}")))?;
    Ok(())
}

/// Write `t, T_I, T_S, ber fit, residual` for every sample of the trial.
pub fn write_samples_csv(path: &Path, trial: &Trial, fit: &FitResult) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["t", "t_internal", "t_surface", "ber_fit", "residual"])
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for i in 0..trial.len() {
        let t = trial.t[i];
        let y_fit = BerModel::predict(t, &fit.params);
        let residual = trial.t_internal[i] - y_fit;
        writer
            .write_record([
                format!("{t}"),
                format!("{}", trial.t_internal[i]),
                format!("{}", trial.t_surface[i]),
                format!("{y_fit:.6}"),
                format!("{residual:.6}"),
            ])
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush export CSV: {e}")))?;
    log::info!("wrote {} rows to {}", trial.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParameters, FitQuality, SurfaceFlag};
    use crate::io::ingest::{IngestOptions, load_trial};
    use nalgebra::Matrix3;

    #[test]
    fn trial_csv_is_readable_by_loader() {
        let rows = vec![
            TrialRow { t: 0.0, t_internal: 20.5, t_hot: 79.0, t_cold: 1.0, flag: SurfaceFlag::Out },
            TrialRow { t: 0.25, t_internal: 21.0, t_hot: 80.0, t_cold: 2.0, flag: SurfaceFlag::Hot },
            TrialRow { t: 0.5, t_internal: 21.5, t_hot: 81.0, t_cold: 3.0, flag: SurfaceFlag::Cold },
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trial.csv");
        write_trial_csv(&path, &rows).unwrap();

        let ingested = load_trial(&path, "synthetic", IngestOptions { strict_flags: true }).unwrap();
        assert_eq!(ingested.trial.t, vec![0.0, 0.25, 0.5]);
        assert_eq!(ingested.trial.t_surface, vec![20.5, 80.0, 3.0]);
    }

    #[test]
    fn export_writes_header_and_rows() {
        let params = FitParameters::new(1.0, 1.0, 10.0);
        let t = vec![0.0, 0.5, 1.0];
        let y: Vec<f64> = t.iter().map(|&x| BerModel::predict(x, &params)).collect();
        let trial = Trial::new("x", t, y.clone(), y).unwrap();
        let fit = FitResult {
            params,
            covariance: Matrix3::zeros(),
            std_errors: [0.0; 3],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                n: 3,
                evaluations: 1,
            },
            termination: "ResidualsZero".to_string(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_samples_csv(&path, &trial, &fit).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "t,t_internal,t_surface,ber_fit,residual");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("0,11,11,11.000000,"));
    }
}
