//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads trials and runs fits / grid searches
//! - prints reports and plots
//! - writes optional exports

use std::path::Path;

use clap::Parser;

use crate::cli::{Command, DemoArgs, FitArgs, PlotArgs, RunArgs, SearchArgs, SynthArgs};
use crate::config::RunConfig;
use crate::data::{SynthConfig, generate_trial_rows};
use crate::domain::FitParameters;
use crate::error::AppError;
use crate::fit::{FitOptions, NoProgress, SearchOptions, SearchProgress, fit_trial, grid_search, lin_space};
use crate::io::ingest::{IngestOptions, load_trial};
use crate::math::{ber0, series_bessel};
use crate::plot::{Series, render_figure, render_fit_file, render_panel};
use crate::report;

pub mod pipeline;
pub mod progress;

use progress::Spinner;

/// Residuals listed on each side of the curve by `tdfit fit`.
const OUTLIER_ROWS: usize = 5;

/// Entry point for the `tdfit` binary.
pub fn run() -> Result<(), AppError> {
    // `tdfit` and `tdfit -c run.toml` behave like `tdfit run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Fit(args) => handle_fit(args),
        Command::Search(args) => handle_search(args),
        Command::Demo(args) => handle_demo(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // A second init (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let mut config = load_run_config(&args)?;
    if args.optimize {
        config.optimizing = true;
    }
    config.validate()?;

    let progress: Box<dyn SearchProgress> = if config.optimizing {
        Box::new(Spinner::new(config.grid.len(), &config.search_trial))
    } else {
        Box::new(NoProgress)
    };
    let run = pipeline::run_config(&config, progress.as_ref())?;

    if args.tui && !run.fits.is_empty() {
        let panels = run
            .fits
            .iter()
            .map(|f| crate::tui::TrialPanel {
                trial: f.ingest.trial.clone(),
                fit: Some(f.fit.clone()),
            })
            .collect();
        crate::tui::run(panels)?;
    } else {
        for f in &run.fits {
            eprint!("{}", report::format_warnings(&f.ingest.trial.label, &f.ingest.warnings));
            println!("{}", report::format_fit_summary(&f.ingest, &f.fit));
        }
        if !run.fits.is_empty() {
            let panels: Vec<_> = run.fits.iter().map(|f| (&f.ingest.trial, Some(&f.fit))).collect();
            println!("{}", render_figure(&panels, args.size.width, args.size.height));
        }
    }

    if let Some(search) = &run.search {
        println!("{}", report::format_search_summary(&search.label, &search.outcome));
    }
    if run.fits.is_empty() && run.search.is_none() {
        log::warn!("Both plotting and optimizing are disabled; nothing to do.");
    }
    Ok(())
}

/// Config file (or built-in table), with trial paths resolved against `--data-dir`
/// when given, else against the config file's directory.
fn load_run_config(args: &RunArgs) -> Result<RunConfig, AppError> {
    let mut config = match &args.config {
        Some(path) if args.data_dir.is_none() => return RunConfig::from_file(path),
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                AppError::input(format!("Failed to read config file '{}': {e}", path.display()))
            })?;
            RunConfig::parse_toml(&content)?
        }
        None => RunConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.resolve_paths(dir);
    }
    Ok(config)
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let label = trial_label(&args.input, args.label.as_deref());
    let ingest = load_trial(&args.input, &label, IngestOptions { strict_flags: args.strict_flags })?;
    eprint!("{}", report::format_warnings(&label, &ingest.warnings));

    let fit = fit_trial(&ingest.trial, args.seed, &FitOptions::default())?;
    println!("{}", report::format_fit_summary(&ingest, &fit));

    let residuals = report::compute_residuals(&ingest.trial, &fit)?;
    println!("{}", report::format_outliers(&report::rank_outliers(&residuals, OUTLIER_ROWS)));

    if !args.no_plot {
        println!("{}", render_figure(&[(&ingest.trial, Some(&fit))], args.size.width, args.size.height));
    }

    if let Some(path) = &args.export {
        crate::io::export::write_samples_csv(path, &ingest.trial, &fit)?;
    }
    if let Some(path) = &args.export_curve {
        crate::io::curve::write_fit_json(path, &ingest.trial, &fit)?;
    }
    Ok(())
}

fn handle_search(args: SearchArgs) -> Result<(), AppError> {
    let label = trial_label(&args.input, args.label.as_deref());
    let ingest = load_trial(&args.input, &label, IngestOptions { strict_flags: args.strict_flags })?;
    eprint!("{}", report::format_warnings(&label, &ingest.warnings));

    let grid = args.grid();
    let opts = SearchOptions {
        mode: args.seed_mode,
        parallel: args.parallel,
        fit: FitOptions::default(),
    };
    let progress = Spinner::new(grid.len(), &label);
    let outcome = grid_search(&ingest.trial, &grid, &opts, &progress)?;
    println!("{}", report::format_search_summary(&label, &outcome));

    if args.refit {
        let fit = fit_trial(&ingest.trial, Some(outcome.best_seed()), &FitOptions::default())?;
        println!("{}", report::format_fit_summary(&ingest, &fit));
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let params = FitParameters::new(args.amplitude, args.frequency, args.offset);
    if !params.is_finite() {
        return Err(AppError::input("Demo parameters must be finite."));
    }
    if args.points < 2 {
        return Err(AppError::input("Demo needs at least 2 points."));
    }
    let xs = lin_space(0.0, args.x_max, args.points)?;

    let ber: Vec<(f64, f64)> = xs
        .iter()
        .map(|&x| (x, ber0(x, params.amplitude, params.frequency, params.offset)))
        .collect();
    let bessel: Vec<(f64, f64)> = xs
        .iter()
        .map(|&x| (x, series_bessel(x, params.amplitude, params.frequency)))
        .collect();

    let (w, h) = (args.size.width, args.size.height);
    println!("{}", render_panel("ber0 reference", &[Series::line("ber0", '-', ber)], w, h));
    println!("{}", render_panel("series Bessel", &[Series::line("J0 series", '*', bessel)], w, h));
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        params: FitParameters::new(args.amplitude, args.frequency, args.offset),
        t_max: args.t_max,
        points: args.points,
        noise_sd: args.noise_sd,
        seed: args.seed,
        ..SynthConfig::default()
    };
    let rows = generate_trial_rows(&config)?;
    crate::io::export::write_trial_csv(&args.output, &rows)?;
    log::info!("wrote {} synthetic rows to {}", rows.len(), args.output.display());
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::curve::read_fit_json(&args.curve)?;
    println!("{}", render_fit_file(&curve, args.size.width, args.size.height));
    Ok(())
}

fn trial_label(path: &Path, label: Option<&str>) -> String {
    label
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "trial".to_string())
}

/// Rewrite argv so `tdfit` defaults to `tdfit run`.
///
/// Rules:
/// - `tdfit`                       -> `tdfit run`
/// - `tdfit -c run.toml ...`       -> `tdfit run -c run.toml ...`
/// - `tdfit -v`                    -> `tdfit -v run`
/// - `tdfit --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    const SUBCOMMANDS: [&str; 7] = ["run", "fit", "search", "demo", "synth", "plot", "help"];

    // Skip leading verbosity flags; they are global.
    let first = argv
        .iter()
        .skip(1)
        .position(|a| !is_verbosity_flag(a))
        .map(|i| i + 1);

    let Some(idx) = first else {
        argv.push("run".to_string());
        return argv;
    };

    let arg = argv[idx].as_str();
    if matches!(arg, "-h" | "--help" | "-V" | "--version") || SUBCOMMANDS.contains(&arg) {
        return argv;
    }

    // Any other flag or positional is treated as `run` input.
    argv.insert(idx, "run".to_string());
    argv
}

fn is_verbosity_flag(arg: &str) -> bool {
    arg == "--verbose" || (arg.len() > 1 && arg.starts_with('-') && !arg.starts_with("--") && arg[1..].chars().all(|c| c == 'v'))
}
