//! Evaluation configuration
//!
//! Loaded from JSON (every field optional) or assembled with a builder.
//!
//! ```json
//! { "output_dir": "measure_ltgen", "n_trials": 10, "workers": 4 }
//! ```

use crate::storage::StoreLayout;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "measure_ltgen";

/// Default number of accuracy trials
pub const DEFAULT_TRIALS: usize = 10;

/// Settings of one evaluation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Directory holding streams, markers and the counter snapshot
    pub output_dir: PathBuf,
    /// Independent candidate trials scored for accuracy
    pub n_trials: usize,
    /// Trials run by generation timing
    pub n_trials_time: usize,
    /// Concurrent trial workers; 0 picks one per core
    pub workers: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            n_trials: DEFAULT_TRIALS,
            n_trials_time: DEFAULT_TRIALS,
            workers: 0,
        }
    }
}

impl EvalConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }

    /// Load from a JSON file; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or the values are
    /// invalid
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if `n_trials` is zero
    pub fn validate(&self) -> Result<()> {
        if self.n_trials == 0 {
            return Err(Error::InvalidInput("n_trials must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Storage layout of the output directory
    #[must_use]
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.output_dir)
    }
}

/// Builder for [`EvalConfig`]
#[derive(Debug, Default)]
pub struct EvalConfigBuilder {
    config: EvalConfig,
}

impl EvalConfigBuilder {
    /// Set the output directory
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the number of accuracy trials
    #[must_use]
    pub const fn n_trials(mut self, n: usize) -> Self {
        self.config.n_trials = n;
        self
    }

    /// Set the number of timing trials
    #[must_use]
    pub const fn n_trials_time(mut self, n: usize) -> Self {
        self.config.n_trials_time = n;
        self
    }

    /// Set the number of concurrent trial workers (0 = one per core)
    #[must_use]
    pub const fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns error if `n_trials` is zero
    pub fn build(self) -> Result<EvalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
