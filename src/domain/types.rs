//! Shared domain types.
//!
//! A `Trial` is one experimental run loaded from CSV. Fits produce fresh
//! `FitResult`s and never mutate the trial they were computed from.

use clap::ValueEnum;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which probe supplies the surface temperature for a sample row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFlag {
    /// `H`: the hot-probe reading `T_H`.
    Hot,
    /// `C`: the cold-probe reading `T_C`.
    Cold,
    /// `O`: sample is out of both baths; use the first internal reading.
    Out,
}

impl SurfaceFlag {
    /// Parse the `HOT/COLD/OUT` cell. Matching is exact after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "H" => Some(SurfaceFlag::Hot),
            "C" => Some(SurfaceFlag::Cold),
            "O" => Some(SurfaceFlag::Out),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            SurfaceFlag::Hot => 'H',
            SurfaceFlag::Cold => 'C',
            SurfaceFlag::Out => 'O',
        }
    }
}

/// One row of a trial CSV before the surface temperature is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRow {
    pub t: f64,
    pub t_internal: f64,
    pub t_hot: f64,
    pub t_cold: f64,
    pub flag: SurfaceFlag,
}

/// One experimental run: time, internal temperature and derived surface temperature.
///
/// Invariant: all three sequences have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub label: String,
    /// Time of measurement (s).
    pub t: Vec<f64>,
    /// Internal temperature `T_I` (°C).
    pub t_internal: Vec<f64>,
    /// Surface temperature `T_S` (°C), selected per row by the surface flag.
    pub t_surface: Vec<f64>,
}

impl Trial {
    pub fn new(
        label: impl Into<String>,
        t: Vec<f64>,
        t_internal: Vec<f64>,
        t_surface: Vec<f64>,
    ) -> Result<Self, AppError> {
        let label = label.into();
        if t.len() != t_internal.len() || t.len() != t_surface.len() {
            return Err(AppError::data(format!(
                "Trial '{label}' has mismatched lengths: t={}, T_I={}, T_S={}.",
                t.len(),
                t_internal.len(),
                t_surface.len()
            )));
        }
        Ok(Self {
            label,
            t,
            t_internal,
            t_surface,
        })
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// `(min, max)` of the time axis, if it spans a non-empty finite interval.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        finite_range(self.t.iter().copied())
    }

    /// `(min, max)` over both temperature channels.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        finite_range(self.t_internal.iter().chain(self.t_surface.iter()).copied())
    }
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

/// Parameters of one ber₀ fit: `A · ber(t² f) + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    /// Amplitude `A` (°C).
    pub amplitude: f64,
    /// Frequency-like term `f`; encodes the diffusivity/geometry ratio.
    pub frequency: f64,
    /// Vertical offset (°C).
    pub offset: f64,
}

impl FitParameters {
    pub const fn new(amplitude: f64, frequency: f64, offset: f64) -> Self {
        Self {
            amplitude,
            frequency,
            offset,
        }
    }

    /// The seed the fitter uses when the caller supplies none.
    pub const fn unit() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.amplitude, self.frequency, self.offset]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 3]> for FitParameters {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vector3<f64>> for FitParameters {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<FitParameters> for Vector3<f64> {
    fn from(p: FitParameters) -> Self {
        Vector3::new(p.amplitude, p.frequency, p.offset)
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    /// Residual evaluations spent by the optimizer.
    pub evaluations: usize,
}

/// Output of a single curve fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub params: FitParameters,
    /// Parameter covariance, ordered `(amplitude, frequency, offset)`.
    pub covariance: Matrix3<f64>,
    /// Square roots of the covariance diagonal.
    pub std_errors: [f64; 3],
    pub quality: FitQuality,
    /// Optimizer termination reason, for diagnostics.
    pub termination: String,
}

impl FitResult {
    /// Standard error on the amplitude term (the grid-search score).
    pub fn amplitude_error(&self) -> f64 {
        self.std_errors[0]
    }
}

/// How the grid search seeds each fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    /// Every grid point is fitted from the fitter's default seed; the candidate is
    /// only used as the label of the result. Equal scores resolve to the last grid
    /// point. Reproduces the legacy sweep.
    Parity,
    /// The grid point is passed to the fitter as its initial guess.
    Candidate,
}

impl SeedMode {
    pub fn display_name(self) -> &'static str {
        match self {
            SeedMode::Parity => "parity (candidate seed ignored by the fitter)",
            SeedMode::Candidate => "candidate (grid point used as initial guess)",
        }
    }
}

/// A saved fit (JSON), reloadable for plotting.
///
/// Non-finite numbers are stored as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub label: String,
    pub params: FitParameters,
    pub std_errors: [Option<f64>; 3],
    pub covariance: [[Option<f64>; 3]; 3],
    pub quality: FitQuality,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
}
