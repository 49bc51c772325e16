//! Quotas

use serde::Deserialize;
use thiserror::Error;

/// Quota configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum QuotaError {
    /// The minimum quota is larger than the maximum quota.
    #[error("min_quota ({min_quota}) cannot be greater than max_quota ({max_quota})")]
    MinExceedsMax {
        /// Configured minimum
        min_quota: usize,

        /// Configured maximum
        max_quota: usize,
    },

    /// The option weight is negative or not a finite number.
    #[error("option_weight must be a finite, non-negative number, got {0}")]
    InvalidOptionWeight(f64),
}

/// Capacity bounds for active options and the weight given to activating them.
///
/// An option either holds nobody or holds between `min_quota` and `max_quota`
/// participants inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawQuotaConfig")]
pub struct QuotaConfig {
    min_quota: usize,
    max_quota: usize,
    option_weight: f64,
}

impl QuotaConfig {
    /// Create a validated quota configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`QuotaError`] if `min_quota > max_quota` or the weight is negative
    /// or not finite.
    pub fn new(min_quota: usize, max_quota: usize, option_weight: f64) -> Result<Self, QuotaError> {
        if min_quota > max_quota {
            return Err(QuotaError::MinExceedsMax {
                min_quota,
                max_quota,
            });
        }

        if !option_weight.is_finite() || option_weight < 0.0 {
            return Err(QuotaError::InvalidOptionWeight(option_weight));
        }

        Ok(Self {
            min_quota,
            max_quota,
            option_weight,
        })
    }

    /// Minimum participants in an active option.
    pub fn min_quota(&self) -> usize {
        self.min_quota
    }

    /// Maximum participants in any option.
    pub fn max_quota(&self) -> usize {
        self.max_quota
    }

    /// Objective reward for each active option.
    pub fn option_weight(&self) -> f64 {
        self.option_weight
    }

    /// Whether `count` participants is an allowed size for an option.
    pub fn admits(&self, count: usize) -> bool {
        count == 0 || (self.min_quota..=self.max_quota).contains(&count)
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            min_quota: 2,
            max_quota: 3,
            option_weight: 1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuotaConfig {
    #[serde(default = "default_min_quota")]
    min_quota: usize,

    #[serde(default = "default_max_quota")]
    max_quota: usize,

    #[serde(default = "default_option_weight")]
    option_weight: f64,
}

fn default_min_quota() -> usize {
    QuotaConfig::default().min_quota
}

fn default_max_quota() -> usize {
    QuotaConfig::default().max_quota
}

fn default_option_weight() -> f64 {
    QuotaConfig::default().option_weight
}

impl TryFrom<RawQuotaConfig> for QuotaConfig {
    type Error = QuotaError;

    fn try_from(raw: RawQuotaConfig) -> Result<Self, Self::Error> {
        Self::new(raw.min_quota, raw.max_quota, raw.option_weight)
    }
}
