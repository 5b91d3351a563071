//! Synthetic trial generation from a known ber₀ curve.
//!
//! Used to exercise the fitter end to end without lab data: the internal
//! temperature follows `BerModel` plus Gaussian noise, the probe channels hover
//! around fixed bath temperatures, and the surface flag alternates between the
//! hot and cold bath every `switch_period` seconds after an initial `O` row.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FitParameters, SurfaceFlag, TrialRow};
use crate::error::AppError;
use crate::models::BerModel;

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub params: FitParameters,
    /// Last sample time (s); samples are evenly spaced from 0.
    pub t_max: f64,
    pub points: usize,
    /// Standard deviation of additive noise on every temperature channel (°C).
    pub noise_sd: f64,
    pub seed: u64,
    pub hot_temp: f64,
    pub cold_temp: f64,
    /// Seconds spent in each bath before switching.
    pub switch_period: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            params: FitParameters::new(3.0, 1.0, 25.0),
            t_max: 2.0,
            points: 41,
            noise_sd: 0.0,
            seed: 42,
            hot_temp: 80.0,
            cold_temp: 2.0,
            switch_period: 0.5,
        }
    }
}

/// Generate raw trial rows (in the CSV input schema).
pub fn generate_trial_rows(config: &SynthConfig) -> Result<Vec<TrialRow>, AppError> {
    if config.points < 2 {
        return Err(AppError::input("Synthetic trial needs at least 2 points."));
    }
    if !(config.t_max.is_finite() && config.t_max > 0.0) {
        return Err(AppError::input("Synthetic t_max must be finite and > 0."));
    }
    if !(config.switch_period.is_finite() && config.switch_period > 0.0) {
        return Err(AppError::input("Synthetic switch_period must be finite and > 0."));
    }
    if !config.params.is_finite() {
        return Err(AppError::input("Synthetic parameters must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise_sd.max(0.0))
        .map_err(|e| AppError::input(format!("Noise distribution error: {e}")))?;

    let mut rows = Vec::with_capacity(config.points);
    for i in 0..config.points {
        let t = config.t_max * i as f64 / (config.points as f64 - 1.0);
        let flag = if i == 0 {
            SurfaceFlag::Out
        } else if ((t / config.switch_period).floor() as u64) % 2 == 0 {
            SurfaceFlag::Hot
        } else {
            SurfaceFlag::Cold
        };

        rows.push(TrialRow {
            t,
            t_internal: BerModel::predict(t, &config.params) + normal.sample(&mut rng),
            t_hot: config.hot_temp + normal.sample(&mut rng),
            t_cold: config.cold_temp + normal.sample(&mut rng),
            flag,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_rows_follow_the_model() {
        let config = SynthConfig::default();
        let rows = generate_trial_rows(&config).unwrap();
        assert_eq!(rows.len(), 41);
        assert_eq!(rows[0].flag, SurfaceFlag::Out);
        assert_eq!(rows[0].t_internal, 28.0);
        assert_eq!(rows[40].t, 2.0);
        for r in &rows {
            assert_eq!(r.t_internal, BerModel::predict(r.t, &config.params));
        }
        assert!(rows.iter().any(|r| r.flag == SurfaceFlag::Hot));
        assert!(rows.iter().any(|r| r.flag == SurfaceFlag::Cold));
    }

    #[test]
    fn same_seed_same_noise() {
        let config = SynthConfig {
            noise_sd: 0.3,
            ..SynthConfig::default()
        };
        let a = generate_trial_rows(&config).unwrap();
        let b = generate_trial_rows(&config).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().any(|r| r.t_internal != BerModel::predict(r.t, &config.params)));
    }

    #[test]
    fn rejects_degenerate_settings() {
        let config = SynthConfig {
            points: 1,
            ..SynthConfig::default()
        };
        assert!(generate_trial_rows(&config).is_err());
    }
}
