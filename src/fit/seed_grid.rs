//! Seed grid generation for the initial-guess search.
//!
//! The grid is the Cartesian product of three independently spaced axes
//! (amplitude × frequency × offset). Iteration order is amplitude outermost and
//! offset innermost, so grid indices are stable across runs.

use serde::{Deserialize, Serialize};

use crate::domain::FitParameters;
use crate::error::AppError;

/// Upper bound on the number of grid points; each point is a full fit.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
///
/// `steps == 1` yields `[min]`.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(AppError::input(format!(
            "Invalid grid range: min={min}, max={max} (must be finite)."
        )));
    }
    if steps == 0 {
        return Err(AppError::input("Grid steps must be >= 1."));
    }
    if steps == 1 {
        return Ok(vec![min]);
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    // Pin the upper endpoint exactly.
    if let Some(last) = out.last_mut() {
        *last = max;
    }
    Ok(out)
}

/// One axis of the seed grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl Axis {
    pub const fn new(min: f64, max: f64, steps: usize) -> Self {
        Self { min, max, steps }
    }

    /// A single-point axis.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, 1)
    }

    pub fn values(&self) -> Result<Vec<f64>, AppError> {
        lin_space(self.min, self.max, self.steps)
    }
}

/// Candidate seeds for `(A, f, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedGrid {
    pub amplitude: Axis,
    pub frequency: Axis,
    pub offset: Axis,
}

impl Default for SeedGrid {
    /// 20 × 20 × 10 = 4,000 seeds.
    fn default() -> Self {
        Self {
            amplitude: Axis::new(0.0, 20.0, 20),
            frequency: Axis::new(10.0, 100_000.0, 20),
            offset: Axis::new(20.0, 70.0, 10),
        }
    }
}

impl SeedGrid {
    /// A 1×1×1 grid around a single seed.
    pub fn single(seed: FitParameters) -> Self {
        Self {
            amplitude: Axis::fixed(seed.amplitude),
            frequency: Axis::fixed(seed.frequency),
            offset: Axis::fixed(seed.offset),
        }
    }

    /// Number of grid points, or `None` if the product overflows `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.amplitude
            .steps
            .checked_mul(self.frequency.steps)?
            .checked_mul(self.offset.steps)
    }

    /// Number of grid points, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point count, rejecting empty grids and grids above `MAX_GRID_POINTS`.
    pub fn check(&self) -> Result<usize, AppError> {
        let steps = [self.amplitude.steps, self.frequency.steps, self.offset.steps];
        match self.checked_len() {
            Some(0) => Err(AppError::input("Seed grid has no points (every axis needs steps >= 1).")),
            Some(n) if n <= MAX_GRID_POINTS => Ok(n),
            _ => Err(AppError::input(format!(
                "Seed grid {}x{}x{} exceeds {MAX_GRID_POINTS} points.",
                steps[0], steps[1], steps[2]
            ))),
        }
    }

    /// Materialize all seeds in grid order.
    pub fn seeds(&self) -> Result<Vec<FitParameters>, AppError> {
        let total = self.check()?;
        let amplitudes = self.amplitude.values()?;
        let frequencies = self.frequency.values()?;
        let offsets = self.offset.values()?;

        let mut out = Vec::with_capacity(total);
        for &a in &amplitudes {
            for &f in &frequencies {
                for &o in &offsets {
                    out.push(FitParameters::new(a, f, o));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(10.0, 100_000.0, 20).unwrap();
        assert_eq!(v.len(), 20);
        assert_eq!(v[0], 10.0);
        assert_eq!(v[19], 100_000.0);
        let step = v[1] - v[0];
        assert!((step - (100_000.0 - 10.0) / 19.0).abs() < 1e-9);
    }

    #[test]
    fn lin_space_single_step_is_min() {
        assert_eq!(lin_space(3.0, 9.0, 1).unwrap(), vec![3.0]);
    }

    #[test]
    fn lin_space_rejects_bad_input() {
        assert!(lin_space(0.0, 1.0, 0).is_err());
        assert!(lin_space(f64::NAN, 1.0, 3).is_err());
    }

    #[test]
    fn default_grid_has_4000_seeds_in_order() {
        let grid = SeedGrid::default();
        let seeds = grid.seeds().unwrap();
        assert_eq!(seeds.len(), 4000);
        assert_eq!(seeds[0], FitParameters::new(0.0, 10.0, 20.0));
        // Offset varies fastest.
        assert_eq!(seeds[1].amplitude, 0.0);
        assert_eq!(seeds[1].frequency, 10.0);
        assert!(seeds[1].offset > 20.0);
        assert_eq!(seeds[3999], FitParameters::new(20.0, 100_000.0, 70.0));
    }

    #[test]
    fn oversized_grid_is_rejected_before_allocating() {
        let huge = SeedGrid {
            amplitude: Axis::new(0.0, 1.0, usize::MAX / 2),
            frequency: Axis::new(0.0, 1.0, 4),
            offset: Axis::new(0.0, 1.0, 4),
        };
        assert_eq!(huge.checked_len(), None);
        assert_eq!(huge.len(), usize::MAX);
        let err = huge.seeds().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);

        let big = SeedGrid {
            amplitude: Axis::new(0.0, 1.0, 1000),
            frequency: Axis::new(0.0, 1.0, 1000),
            offset: Axis::new(0.0, 1.0, 2),
        };
        assert_eq!(big.checked_len(), Some(2_000_000));
        assert!(big.check().is_err());
        assert_eq!(SeedGrid::default().check().unwrap(), 4000);
    }

    #[test]
    fn empty_axis_makes_grid_invalid() {
        let grid = SeedGrid {
            offset: Axis::new(0.0, 1.0, 0),
            ..SeedGrid::default()
        };
        assert!(grid.is_empty());
        assert!(grid.check().is_err());
    }

    #[test]
    fn single_grid_yields_the_seed() {
        let seed = FitParameters::new(20.0, 10_000.0, 70.0);
        let seeds = SeedGrid::single(seed).seeds().unwrap();
        assert_eq!(seeds, vec![seed]);
    }
}
