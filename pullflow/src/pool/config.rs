//! Pool configuration.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the pool does when an element fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop pulling on the first failure and fail the run (default).
    #[default]
    FailFast,
    /// Keep going; record every failure at its position.
    Collect,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::Collect => write!(f, "collect"),
        }
    }
}

/// Configuration for [`AsyncPool`](super::AsyncPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of concurrent workers. Must be at least 1.
    pub concurrency: usize,
    /// Failure handling.
    pub error_policy: ErrorPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            error_policy: ErrorPolicy::FailFast,
        }
    }
}

impl PoolConfig {
    /// Creates the default configuration: four workers, fail-fast.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of workers.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.concurrency == 0 {
            return Err(ConfigurationError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }
}
