//! Brute-force search for a good initial guess.
//!
//! For every point of a `SeedGrid` we run a full fit and score it by the standard
//! error of the fitted amplitude. The seed whose fit has the smallest amplitude
//! error wins.
//!
//! Two seeding modes exist (`SeedMode`):
//! - `Parity`: each fit starts from the fitter's default seed, so every grid point
//!   produces the same fit. The candidate only labels the record. This mirrors the
//!   legacy sweep and is kept for reproducibility of old results.
//! - `Candidate`: the grid point is the fit's initial guess.
//!
//! Selection rules:
//! 1. finite errors beat non-finite ones (failed fits score `NaN`)
//! 2. smaller error wins
//! 3. equal errors: `Parity` keeps the last grid index (the legacy sweep stored
//!    results keyed by the error, so later points overwrote earlier ones);
//!    `Candidate` keeps the earliest
//!
//! With no finite error at all, the first grid point is returned.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use rayon::prelude::*;

use crate::domain::{FitParameters, SeedMode, Trial};
use crate::error::AppError;
use crate::fit::fitter::{FitOptions, fit_trial};
use crate::fit::seed_grid::SeedGrid;

/// Liveness callback, invoked once per evaluated grid point.
///
/// Calls may come from several threads when the search runs in parallel.
pub trait SearchProgress: Sync {
    fn on_point(&self, done: usize, total: usize);

    fn on_finish(&self, _total: usize) {}
}

/// Progress sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl SearchProgress for NoProgress {
    fn on_point(&self, _done: usize, _total: usize) {}
}

/// Grid-search settings.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SeedMode,
    /// Evaluate grid points on the rayon pool. Results are identical to a sequential run.
    pub parallel: bool,
    pub fit: FitOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SeedMode::Parity,
            parallel: false,
            fit: FitOptions::default(),
        }
    }
}

/// One grid point and the amplitude error of the fit it produced.
#[derive(Debug, Clone, Copy)]
pub struct SeedScore {
    pub index: usize,
    pub seed: FitParameters,
    /// Standard error on `A`; `NaN` when the fit failed.
    pub amplitude_error: f64,
}

/// Output of a grid search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: SeedScore,
    /// All records in grid order.
    pub scores: Vec<SeedScore>,
    pub mode: SeedMode,
    /// Number of grid points whose fit returned an error.
    pub fits_failed: usize,
}

impl SearchOutcome {
    pub fn best_seed(&self) -> FitParameters {
        self.best.seed
    }
}

/// Sweep `grid` over `trial` and return the seed with the smallest amplitude error.
pub fn grid_search(
    trial: &Trial,
    grid: &SeedGrid,
    opts: &SearchOptions,
    progress: &dyn SearchProgress,
) -> Result<SearchOutcome, AppError> {
    let seeds = grid.seeds()?;
    if seeds.is_empty() {
        return Err(AppError::input("Seed grid is empty."));
    }
    if opts.mode == SeedMode::Parity && seeds.len() > 1 {
        log::warn!(
            "Grid search in parity mode: candidates are not passed to the fitter, \
             every grid point refits from the default seed."
        );
    }

    let total = seeds.len();
    let done = AtomicUsize::new(0);

    let evaluate = |(index, seed): (usize, &FitParameters)| -> (SeedScore, bool) {
        let guess = match opts.mode {
            SeedMode::Parity => None,
            SeedMode::Candidate => Some(*seed),
        };
        let (amplitude_error, failed) = match fit_trial(trial, guess, &opts.fit) {
            Ok(fit) => (fit.amplitude_error(), false),
            Err(e) => {
                log::debug!("grid point {index} ({:?}) failed: {e}", seed.to_array());
                (f64::NAN, true)
            }
        };
        let n = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        progress.on_point(n, total);
        (
            SeedScore {
                index,
                seed: *seed,
                amplitude_error,
            },
            failed,
        )
    };

    // `collect` on an indexed parallel iterator preserves grid order.
    let evaluated: Vec<(SeedScore, bool)> = if opts.parallel {
        seeds.par_iter().enumerate().map(evaluate).collect()
    } else {
        seeds.iter().enumerate().map(evaluate).collect()
    };
    progress.on_finish(total);

    let fits_failed = evaluated.iter().filter(|(_, failed)| *failed).count();
    let scores: Vec<SeedScore> = evaluated.into_iter().map(|(s, _)| s).collect();

    let best = select_best(&scores, opts.mode)
        .copied()
        .ok_or_else(|| AppError::input("Seed grid is empty."))?;

    if fits_failed > 0 {
        log::warn!("{fits_failed} of {total} grid fits failed for trial '{}'.", trial.label);
    }
    log::info!(
        "grid search ({:?}): best seed #{} {:?} with amplitude error {}",
        opts.mode,
        best.index,
        best.seed.to_array(),
        best.amplitude_error
    );

    Ok(SearchOutcome {
        best,
        scores,
        mode: opts.mode,
        fits_failed,
    })
}

/// Pick the record with the smallest finite error.
///
/// Equal finite errors resolve to the last index in `Parity` mode and to the
/// earliest in `Candidate` mode.
pub fn select_best(scores: &[SeedScore], mode: SeedMode) -> Option<&SeedScore> {
    scores.iter().min_by(|a, b| compare_scores(a, b, mode))
}

fn compare_scores(a: &SeedScore, b: &SeedScore, mode: SeedMode) -> Ordering {
    let a_ok = a.amplitude_error.is_finite();
    let b_ok = b.amplitude_error.is_finite();
    match (a_ok, b_ok) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => {
            let by_index = match mode {
                SeedMode::Parity => b.index.cmp(&a.index),
                SeedMode::Candidate => a.index.cmp(&b.index),
            };
            a.amplitude_error.total_cmp(&b.amplitude_error).then(by_index)
        }
        (false, false) => a.index.cmp(&b.index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::seed_grid::Axis;
    use crate::models::BerModel;

    fn synthetic(params: FitParameters) -> Trial {
        let t: Vec<f64> = (0..30).map(|i| 1.5 * i as f64 / 29.0).collect();
        let y: Vec<f64> = t.iter().map(|&ti| BerModel::predict(ti, &params)).collect();
        Trial::new("synthetic", t, y.clone(), y).unwrap()
    }

    fn score(index: usize, err: f64) -> SeedScore {
        SeedScore {
            index,
            seed: FitParameters::new(index as f64, 0.0, 0.0),
            amplitude_error: err,
        }
    }

    struct Counter(AtomicUsize);

    impl SearchProgress for Counter {
        fn on_point(&self, _done: usize, _total: usize) {
            self.0.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    #[test]
    fn selection_prefers_smallest_finite_error() {
        let scores = vec![score(0, 0.5), score(1, f64::NAN), score(2, 0.1), score(3, f64::INFINITY)];
        for mode in [SeedMode::Parity, SeedMode::Candidate] {
            assert_eq!(select_best(&scores, mode).unwrap().index, 2);
        }
    }

    #[test]
    fn candidate_ties_keep_earliest_index() {
        let scores = vec![score(0, 0.3), score(1, 0.1), score(2, 0.1), score(3, 0.2)];
        assert_eq!(select_best(&scores, SeedMode::Candidate).unwrap().index, 1);
    }

    #[test]
    fn parity_ties_keep_last_index() {
        let scores = vec![score(0, 0.3), score(1, 0.1), score(2, 0.1), score(3, 0.2)];
        assert_eq!(select_best(&scores, SeedMode::Parity).unwrap().index, 2);
    }

    #[test]
    fn selection_falls_back_to_first_point_when_all_fail() {
        let scores = vec![score(0, f64::NAN), score(1, f64::NAN)];
        for mode in [SeedMode::Parity, SeedMode::Candidate] {
            assert_eq!(select_best(&scores, mode).unwrap().index, 0);
            assert!(select_best(&[], mode).is_none());
        }
    }

    #[test]
    fn single_point_grid_returns_its_seed() {
        let trial = synthetic(FitParameters::new(1.2, 0.9, 1.1));
        let seed = FitParameters::new(20.0, 10_000.0, 70.0);
        let grid = SeedGrid::single(seed);

        for mode in [SeedMode::Parity, SeedMode::Candidate] {
            let opts = SearchOptions {
                mode,
                ..SearchOptions::default()
            };
            let outcome = grid_search(&trial, &grid, &opts, &NoProgress).unwrap();
            assert_eq!(outcome.scores.len(), 1);
            assert_eq!(outcome.best_seed(), seed);
        }
    }

    #[test]
    fn parity_mode_scores_every_point_identically() {
        let trial = synthetic(FitParameters::new(1.2, 0.9, 1.1));
        let grid = SeedGrid {
            amplitude: Axis::new(0.0, 20.0, 2),
            frequency: Axis::new(10.0, 100.0, 2),
            offset: Axis::fixed(20.0),
        };
        let counter = Counter(AtomicUsize::new(0));
        let outcome = grid_search(&trial, &grid, &SearchOptions::default(), &counter).unwrap();

        assert_eq!(counter.0.load(AtomicOrdering::Relaxed), 4);
        assert_eq!(outcome.scores.len(), 4);
        let first = outcome.scores[0].amplitude_error.to_bits();
        assert!(outcome.scores.iter().all(|s| s.amplitude_error.to_bits() == first));
        assert_eq!(outcome.best.index, 3);
        assert_eq!(outcome.best_seed(), FitParameters::new(20.0, 100.0, 20.0));
    }

    #[test]
    fn parity_default_grid_returns_last_seed() {
        let trial = synthetic(FitParameters::new(1.2, 0.9, 1.1));
        let opts = SearchOptions {
            parallel: true,
            ..SearchOptions::default()
        };
        let outcome = grid_search(&trial, &SeedGrid::default(), &opts, &NoProgress).unwrap();
        assert_eq!(outcome.scores.len(), 4000);
        assert_eq!(outcome.fits_failed, 0);
        assert_eq!(outcome.best.index, 3999);
        assert_eq!(outcome.best_seed(), FitParameters::new(20.0, 100_000.0, 70.0));
    }

    #[test]
    fn failed_fits_are_counted_and_lose() {
        let truth = FitParameters::new(2.0, 0.8, 30.0);
        let trial = synthetic(truth);
        // A frequency of 1e300 overflows the series for every t > 0, so that fit fails.
        let grid = SeedGrid {
            amplitude: Axis::fixed(2.0),
            frequency: Axis::new(1e300, 0.8, 2),
            offset: Axis::fixed(30.0),
        };
        let opts = SearchOptions {
            mode: SeedMode::Candidate,
            ..SearchOptions::default()
        };
        let outcome = grid_search(&trial, &grid, &opts, &NoProgress).unwrap();
        assert_eq!(outcome.fits_failed, 1);
        assert!(outcome.scores[0].amplitude_error.is_nan());
        assert!(outcome.scores[1].amplitude_error.is_finite());
        assert_eq!(outcome.best.index, 1);
        assert_eq!(outcome.best_seed(), truth);
    }

    #[test]
    fn all_failed_fits_fall_back_to_first_seed() {
        let trial = synthetic(FitParameters::new(2.0, 0.8, 30.0));
        let grid = SeedGrid {
            amplitude: Axis::new(1.0, 2.0, 2),
            frequency: Axis::fixed(1e300),
            offset: Axis::fixed(30.0),
        };
        let opts = SearchOptions {
            mode: SeedMode::Candidate,
            ..SearchOptions::default()
        };
        let outcome = grid_search(&trial, &grid, &opts, &NoProgress).unwrap();
        assert_eq!(outcome.fits_failed, 2);
        assert_eq!(outcome.best.index, 0);
        assert_eq!(outcome.best_seed(), FitParameters::new(1.0, 1e300, 30.0));
    }

    #[test]
    fn parallel_search_matches_sequential() {
        let trial = synthetic(FitParameters::new(2.0, 0.8, 30.0));
        let grid = SeedGrid {
            amplitude: Axis::new(1.0, 3.0, 3),
            frequency: Axis::new(0.5, 1.5, 3),
            offset: Axis::new(28.0, 32.0, 2),
        };
        let seq = SearchOptions {
            mode: SeedMode::Candidate,
            parallel: false,
            fit: FitOptions::default(),
        };
        let par = SearchOptions {
            parallel: true,
            ..seq.clone()
        };

        let a = grid_search(&trial, &grid, &seq, &NoProgress).unwrap();
        let b = grid_search(&trial, &grid, &par, &NoProgress).unwrap();
        assert_eq!(a.best.index, b.best.index);
        assert_eq!(a.fits_failed, b.fits_failed);
        for (x, y) in a.scores.iter().zip(b.scores.iter()) {
            assert_eq!(x.index, y.index);
            assert_eq!(x.amplitude_error.to_bits(), y.amplitude_error.to_bits());
        }
    }
}
