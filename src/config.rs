//! Configuration
//!
//! Run settings for an assignment: quotas, participant shuffling and solver
//! limits. Every field has a default, so an empty YAML document is valid.
//!
//! ```yaml
//! quota:
//!   min_quota: 2
//!   max_quota: 3
//!   option_weight: 1.0
//! shuffle: true
//! seed: 42
//! limits:
//!   time_limit_secs: 30.0
//! ```

use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::{quota::QuotaConfig, solvers::SolveLimits};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The configuration is not valid YAML or fails validation.
    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),
}

/// Settings for a single assignment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssignmentConfig {
    /// Quota bounds and option weight
    pub quota: QuotaConfig,

    /// Shuffle participants before building the model
    pub shuffle: bool,

    /// Seed for the shuffle; implies `shuffle`
    pub seed: Option<u64>,

    /// Limits handed to the MILP backend
    pub limits: SolveLimits,
}

impl AssignmentConfig {
    /// Parse a configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the YAML is malformed or the quota is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Use `quota` for this run.
    #[must_use]
    pub fn with_quota(mut self, quota: QuotaConfig) -> Self {
        self.quota = quota;
        self
    }

    /// Shuffle participants with the given seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.shuffle = true;
        self
    }

    /// Enable or disable participant shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Use `limits` for the backend.
    #[must_use]
    pub fn with_limits(mut self, limits: SolveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Whether participants are shuffled; a seed always enables shuffling.
    pub fn shuffles(&self) -> bool {
        self.shuffle || self.seed.is_some()
    }
}
