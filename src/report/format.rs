//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot-style tests below)

use nalgebra::Matrix3;

use crate::domain::{FitResult, SeedMode};
use crate::fit::SearchOutcome;
use crate::io::ingest::{IngestedTrial, RowWarning};
use crate::report::{Outliers, SampleResidual};

const PARAM_NAMES: [&str; 3] = ["A", "f", "offset"];

/// Dataset stats, fitted parameters, standard errors and covariance for one trial.
pub fn format_fit_summary(ingest: &IngestedTrial, fit: &FitResult) -> String {
    let trial = &ingest.trial;
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", trial.label));
    out.push_str(&format!("Samples: n={}", trial.len()));
    if let Some((t0, t1)) = trial.time_range() {
        out.push_str(&format!(" | t=[{t0:.3}, {t1:.3}]s"));
    }
    if let Some((y0, y1)) = trial.temperature_range() {
        out.push_str(&format!(" | T=[{y0:.2}, {y1:.2}]C"));
    }
    out.push('\n');
    if !ingest.warnings.is_empty() {
        out.push_str(&format!("Warnings: {}\n", ingest.warnings.len()));
    }

    out.push_str("\nParameters:\n");
    let values = fit.params.to_array();
    for (i, name) in PARAM_NAMES.iter().enumerate() {
        out.push_str(&format!(
            "  {name:<7} = {:>14} +/- {}\n",
            fmt_num(values[i]),
            fmt_num(fit.std_errors[i])
        ));
    }

    out.push_str("\nCovariance:\n");
    out.push_str(&format_covariance(&fit.covariance));

    out.push_str(&format!(
        "\nSSE={} RMSE={} evaluations={} ({})\n",
        fmt_num(fit.quality.sse),
        fmt_num(fit.quality.rmse),
        fit.quality.evaluations,
        fit.termination
    ));
    out
}

/// Covariance as a labelled 3x3 table.
pub fn format_covariance(cov: &Matrix3<f64>) -> String {
    let mut out = String::new();
    out.push_str(
        format!("  {:<7} {:>14} {:>14} {:>14}", "", PARAM_NAMES[0], PARAM_NAMES[1], PARAM_NAMES[2])
            .trim_end(),
    );
    out.push('\n');
    for (i, name) in PARAM_NAMES.iter().enumerate() {
        out.push_str(&format!(
            "  {name:<7} {:>14} {:>14} {:>14}\n",
            fmt_num(cov[(i, 0)]),
            fmt_num(cov[(i, 1)]),
            fmt_num(cov[(i, 2)])
        ));
    }
    out
}

/// Winning seed and search statistics.
pub fn format_search_summary(label: &str, outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== grid search: {label} ===\n"));
    out.push_str(&format!("Mode: {}\n", outcome.mode.display_name()));
    out.push_str(&format!(
        "Grid points: {} | failed fits: {}\n",
        outcome.scores.len(),
        outcome.fits_failed
    ));
    let seed = outcome.best_seed().to_array();
    out.push_str(&format!(
        "Best seed #{}: ({}, {}, {}) | amplitude error {}\n",
        outcome.best.index,
        fmt_num(seed[0]),
        fmt_num(seed[1]),
        fmt_num(seed[2]),
        fmt_num(outcome.best.amplitude_error)
    ));
    if outcome.mode == SeedMode::Parity && outcome.scores.len() > 1 {
        out.push_str("Note: parity mode fits every point from the default seed; scores do not depend on the grid.\n");
    }
    out
}

/// Ingest warnings, one per line.
pub fn format_warnings(label: &str, warnings: &[RowWarning]) -> String {
    let mut out = String::new();
    for w in warnings {
        out.push_str(&format!("warning: {label}: line {}: {}\n", w.line, w.message));
    }
    out
}

/// Largest residuals above and below the fitted curve.
pub fn format_outliers(outliers: &Outliers) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals above the fit:\n");
    out.push_str(&format_table(&outliers.above));
    out.push('\n');
    out.push_str("Largest residuals below the fit:\n");
    out.push_str(&format_table(&outliers.below));
    out
}

fn format_table(rows: &[SampleResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>6} {:>10} {:>10} {:>10} {:>10}\n",
        "#", "t", "T_I", "ber fit", "residual"
    ));
    out.push_str(&format!("{:->6} {:->10} {:->10} {:->10} {:->10}\n", "", "", "", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:>6} {:>10.3} {:>10.3} {:>10.3} {:>10.3}\n",
            r.index, r.t, r.observed, r.fitted, r.residual
        ));
    }
    out
}

/// Compact number formatting: fixed point for moderate magnitudes, scientific otherwise.
fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e6).contains(&a) {
        format!("{v:.6e}")
    } else {
        format!("{v:.6}")
    }
}
