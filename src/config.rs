//! Run configuration (TOML).
//!
//! Selects which modes run and carries the per-trial seed table as data:
//!
//! ```toml
//! plotting = true
//! optimizing = false
//! search_trial = "trial3"
//! seed_mode = "parity"
//!
//! [[trials]]
//! label = "trial1"
//! path = "trial1.csv"
//! seed = [20.0, 100000.0, 70.0]
//!
//! [grid.frequency]
//! min = 10.0
//! max = 100000.0
//! steps = 20
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{FitParameters, SeedMode};
use crate::error::AppError;
use crate::fit::SeedGrid;

/// One trial file and its hand-tuned initial guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub label: String,
    pub path: PathBuf,
    /// `[A, f, offset]`; without it the fit starts from `(1, 1, 1)`.
    #[serde(default)]
    pub seed: Option<[f64; 3]>,
}

impl TrialSpec {
    pub fn guess(&self) -> Option<FitParameters> {
        self.seed.map(FitParameters::from)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Fit every trial from its seed and plot the results.
    pub plotting: bool,
    /// Grid-search initial guesses for `search_trial`.
    pub optimizing: bool,
    pub search_trial: String,
    pub seed_mode: SeedMode,
    pub parallel: bool,
    pub strict_flags: bool,
    pub trials: Vec<TrialSpec>,
    pub grid: SeedGrid,
}

impl Default for RunConfig {
    fn default() -> Self {
        let trial = |n: usize, seed: [f64; 3]| TrialSpec {
            label: format!("trial{n}"),
            path: PathBuf::from(format!("trial{n}.csv")),
            seed: Some(seed),
        };
        Self {
            plotting: true,
            optimizing: false,
            search_trial: "trial3".to_string(),
            seed_mode: SeedMode::Parity,
            parallel: false,
            strict_flags: false,
            trials: vec![
                trial(1, [20.0, 100_000.0, 70.0]),
                trial(2, [20.0, 10_000.0, 70.0]),
                trial(3, [10.0, 10_000_000.0, 50.0]),
            ],
            grid: SeedGrid::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    ///
    /// Relative trial paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::input(format!("Failed to read config file '{}': {e}", path.display())))?;
        let mut config = Self::parse_toml(&content)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::input(format!("Failed to parse TOML configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Prefix relative trial paths with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for spec in &mut self.trials {
            if spec.path.is_relative() {
                spec.path = base.join(&spec.path);
            }
        }
    }

    pub fn trial(&self, label: &str) -> Option<&TrialSpec> {
        self.trials.iter().find(|t| t.label == label)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for (i, spec) in self.trials.iter().enumerate() {
            if self.trials[..i].iter().any(|other| other.label == spec.label) {
                return Err(AppError::input(format!("Duplicate trial label '{}'.", spec.label)));
            }
            if let Some(seed) = spec.seed {
                if seed.iter().any(|v| !v.is_finite()) {
                    return Err(AppError::input(format!("Seed for '{}' is not finite.", spec.label)));
                }
            }
        }
        if self.optimizing && self.trial(&self.search_trial).is_none() {
            return Err(AppError::input(format!(
                "search_trial '{}' is not one of the configured trials.",
                self.search_trial
            )));
        }
        self.grid.check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_hand_tuned_table() {
        let config = RunConfig::default();
        assert!(config.plotting);
        assert!(!config.optimizing);
        assert_eq!(config.trials.len(), 3);
        assert_eq!(config.trials[2].guess(), Some(FitParameters::new(10.0, 1e7, 50.0)));
        assert_eq!(config.grid.len(), 4000);
        config.validate().unwrap();
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            plotting = false
            optimizing = true
            search_trial = "a"
            seed_mode = "candidate"
            parallel = true

            [[trials]]
            label = "a"
            path = "a.csv"
            seed = [1.0, 2.0, 3.0]

            [[trials]]
            label = "b"
            path = "/data/b.csv"

            [grid.offset]
            min = 10.0
            max = 20.0
            steps = 3
        "#;

        let mut config = RunConfig::parse_toml(toml).unwrap();
        assert!(!config.plotting);
        assert!(config.optimizing);
        assert_eq!(config.seed_mode, SeedMode::Candidate);
        assert_eq!(config.trials[1].guess(), None);
        assert_eq!(config.grid.offset.steps, 3);
        // Untouched axes keep their defaults.
        assert_eq!(config.grid.amplitude.steps, 20);

        config.resolve_paths(Path::new("/runs"));
        assert_eq!(config.trials[0].path, PathBuf::from("/runs/a.csv"));
        assert_eq!(config.trials[1].path, PathBuf::from("/data/b.csv"));
    }

    #[test]
    fn empty_config_is_default() {
        let config = RunConfig::parse_toml("").unwrap();
        assert_eq!(config.trials, RunConfig::default().trials);
    }

    #[test]
    fn unknown_search_trial_is_rejected() {
        let err = RunConfig::parse_toml("optimizing = true\nsearch_trial = \"nope\"").unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let toml = r#"
            [[trials]]
            label = "a"
            path = "a.csv"
            [[trials]]
            label = "a"
            path = "b.csv"
        "#;
        assert!(RunConfig::parse_toml(toml).is_err());
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let toml = r#"
            [grid.amplitude]
            min = 0.0
            max = 20.0
            steps = 100000

            [grid.frequency]
            min = 10.0
            max = 100000.0
            steps = 100000
        "#;
        let err = RunConfig::parse_toml(toml).unwrap_err();
        assert!(err.message().contains("exceeds"), "{err}");
    }
}
