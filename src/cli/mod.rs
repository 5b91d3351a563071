//! Command-line parsing for the ber₀ thermal-wave fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting/search code. Handlers live in `crate::app`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{FitParameters, SeedMode};
use crate::fit::{Axis, SeedGrid};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tdfit", version, about = "Fit ber₀ thermal-wave curves to trial temperature data")]
pub struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the configured modes: fit every trial from its seed and/or grid-search one trial.
    Run(RunArgs),
    /// Fit a single trial CSV.
    Fit(FitArgs),
    /// Grid-search seeds for a single trial CSV and print the winner.
    Search(SearchArgs),
    /// Plot the reference ber curve and the truncated Bessel series.
    Demo(DemoArgs),
    /// Write a synthetic trial CSV generated from a known ber curve.
    Synth(SynthArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
}

/// Terminal plot size.
#[derive(Debug, Args, Clone, Copy)]
pub struct PlotSize {
    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows per panel).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// TOML run configuration. Without it the built-in trial table is used.
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Directory that relative trial paths resolve against (overrides the config file's directory).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Force the grid search on (same as `optimizing = true`).
    #[arg(long)]
    pub optimize: bool,

    /// Show the fitted trials in the interactive viewer instead of ASCII plots.
    #[arg(long)]
    pub tui: bool,

    #[command(flatten)]
    pub size: PlotSize,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Trial CSV file.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Trial label used in reports (defaults to the file stem).
    #[arg(long)]
    pub label: Option<String>,

    /// Initial guess `A,F,OFFSET`. Defaults to `1,1,1`.
    #[arg(long, value_name = "A,F,OFFSET", value_parser = parse_seed)]
    pub seed: Option<FitParameters>,

    /// Treat unknown `HOT/COLD/OUT` flags as errors.
    #[arg(long)]
    pub strict_flags: bool,

    /// Export per-sample results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fit (params + covariance + curve grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    #[command(flatten)]
    pub size: PlotSize,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Trial CSV file.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Trial label used in reports (defaults to the file stem).
    #[arg(long)]
    pub label: Option<String>,

    /// How grid points seed each fit.
    #[arg(long, value_enum, default_value_t = SeedMode::Parity)]
    pub seed_mode: SeedMode,

    /// Evaluate grid points in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Treat unknown `HOT/COLD/OUT` flags as errors.
    #[arg(long)]
    pub strict_flags: bool,

    /// Fit the trial from the winning seed and report it.
    #[arg(long)]
    pub refit: bool,

    #[arg(long, default_value_t = 0.0)]
    pub a_min: f64,
    #[arg(long, default_value_t = 20.0)]
    pub a_max: f64,
    #[arg(long, default_value_t = 20)]
    pub a_steps: usize,

    #[arg(long, default_value_t = 10.0)]
    pub f_min: f64,
    #[arg(long, default_value_t = 100_000.0)]
    pub f_max: f64,
    #[arg(long, default_value_t = 20)]
    pub f_steps: usize,

    #[arg(long, default_value_t = 20.0)]
    pub offset_min: f64,
    #[arg(long, default_value_t = 70.0)]
    pub offset_max: f64,
    #[arg(long, default_value_t = 10)]
    pub offset_steps: usize,
}

impl SearchArgs {
    pub fn grid(&self) -> SeedGrid {
        SeedGrid {
            amplitude: Axis::new(self.a_min, self.a_max, self.a_steps),
            frequency: Axis::new(self.f_min, self.f_max, self.f_steps),
            offset: Axis::new(self.offset_min, self.offset_max, self.offset_steps),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[arg(long, default_value_t = 1.0)]
    pub amplitude: f64,
    #[arg(long, default_value_t = 20.0)]
    pub frequency: f64,
    #[arg(long, default_value_t = 50.0)]
    pub offset: f64,
    /// Upper end of the x axis (the curve starts at 0).
    #[arg(long, default_value_t = 30.0)]
    pub x_max: f64,
    #[arg(long, default_value_t = 100)]
    pub points: usize,

    #[command(flatten)]
    pub size: PlotSize,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(value_name = "OUT.csv")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 3.0)]
    pub amplitude: f64,
    #[arg(long, default_value_t = 1.0)]
    pub frequency: f64,
    #[arg(long, default_value_t = 25.0)]
    pub offset: f64,
    /// Last sample time (s).
    #[arg(long, default_value_t = 2.0)]
    pub t_max: f64,
    #[arg(long, default_value_t = 41)]
    pub points: usize,
    /// Gaussian noise standard deviation (°C).
    #[arg(long, default_value_t = 0.0)]
    pub noise_sd: f64,
    /// RNG seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved fit.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Fit JSON produced by `tdfit fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    #[command(flatten)]
    pub size: PlotSize,
}

/// Parse `A,F,OFFSET` into fit parameters.
pub fn parse_seed(raw: &str) -> Result<FitParameters, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected A,F,OFFSET, got '{raw}'"));
    }
    let mut values = [0.0; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|e| format!("invalid number '{part}': {e}"))?;
    }
    let params = FitParameters::from(values);
    if !params.is_finite() {
        return Err("seed values must be finite".to_string());
    }
    Ok(params)
}
