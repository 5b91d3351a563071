//! Shared run pipeline used by both the CLI and TUI front-ends.
//!
//! Workflow for a `RunConfig`:
//! load trials -> fit each from its seed (plotting) -> grid search (optimizing)
//!
//! The front-ends then only deal with presentation (printing vs widgets).

use crate::config::{RunConfig, TrialSpec};
use crate::domain::FitResult;
use crate::error::AppError;
use crate::fit::{FitOptions, SearchOptions, SearchOutcome, SearchProgress, fit_trial, grid_search};
use crate::io::ingest::{IngestOptions, IngestedTrial, load_trial};

/// One trial with the fit from its configured seed.
#[derive(Debug, Clone)]
pub struct TrialFit {
    pub ingest: IngestedTrial,
    pub fit: FitResult,
}

/// Grid-search result for the configured search trial.
#[derive(Debug, Clone)]
pub struct SearchRun {
    pub label: String,
    pub outcome: SearchOutcome,
}

/// All computed outputs of a single `tdfit run`.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub fits: Vec<TrialFit>,
    pub search: Option<SearchRun>,
}

/// Load one configured trial.
pub fn load_spec(spec: &TrialSpec, strict_flags: bool) -> Result<IngestedTrial, AppError> {
    load_trial(&spec.path, &spec.label, IngestOptions { strict_flags })
}

/// Execute the modes enabled in `config`.
pub fn run_config(config: &RunConfig, progress: &dyn SearchProgress) -> Result<RunOutput, AppError> {
    config.validate()?;
    let mut out = RunOutput::default();

    if config.plotting {
        let opts = FitOptions::default();
        for spec in &config.trials {
            let ingest = load_spec(spec, config.strict_flags)?;
            let fit = fit_trial(&ingest.trial, spec.guess(), &opts)?;
            log::info!(
                "{}: fitted {:?} (std errors {:?})",
                spec.label,
                fit.params.to_array(),
                fit.std_errors
            );
            out.fits.push(TrialFit { ingest, fit });
        }
    }

    if config.optimizing {
        let spec = config.trial(&config.search_trial).ok_or_else(|| {
            AppError::input(format!("search_trial '{}' is not configured.", config.search_trial))
        })?;
        // Reuse the trial loaded for plotting when there is one.
        let loaded = out.fits.iter().find(|f| f.ingest.trial.label == spec.label);
        let ingest = match loaded {
            Some(f) => f.ingest.clone(),
            None => load_spec(spec, config.strict_flags)?,
        };
        let opts = SearchOptions {
            mode: config.seed_mode,
            parallel: config.parallel,
            fit: FitOptions::default(),
        };
        let outcome = grid_search(&ingest.trial, &config.grid, &opts, progress)?;
        out.search = Some(SearchRun {
            label: spec.label.clone(),
            outcome,
        });
    }

    Ok(out)
}
