//! Error types for pullflow pipelines.
//!
//! Exhaustion of a stream is never an error; it is signalled with
//! [`Pull::Done`](crate::stream::Pull::Done). Everything here describes either
//! a misconfigured pipeline or a user callback that failed on an element.

use std::collections::HashMap;
use thiserror::Error;

/// Boxed error produced by user callbacks.
///
/// Callbacks may return any `E: Into<BoxError>`, which covers concrete error
/// types, `anyhow::Error`, `String` and `&str`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for terminal operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline or pool was configured incorrectly.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A user callback failed while processing the element at `position`.
    #[error("Element {position} failed: {source}")]
    Element {
        /// Zero-based ordinal position of the element in pull order.
        position: usize,
        /// The callback's error.
        #[source]
        source: BoxError,
    },

    /// One or more elements failed under the collect policy.
    #[error("{0}")]
    Aggregate(#[from] AggregateError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Creates an element error at the given position.
    #[must_use]
    pub fn element(position: usize, source: BoxError) -> Self {
        Self::Element { position, source }
    }

    /// Returns the failing ordinal position, if this error names one.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Element { position, .. } => Some(*position),
            Self::Aggregate(agg) => agg.failures.first().map(|f| f.position),
            Self::Configuration(_) | Self::Internal(_) => None,
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Element { .. } => "ElementProcessingError",
            Self::Aggregate(_) => "AggregateError",
            Self::Internal(_) => "InternalError",
        };
        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(position) = self.position() {
            map.insert("position".to_string(), serde_json::json!(position));
        }
        if let Self::Aggregate(agg) = self {
            map.insert(
                "failed_positions".to_string(),
                serde_json::json!(agg.positions()),
            );
            map.insert("total".to_string(), serde_json::json!(agg.total));
        }
        map
    }
}

/// Errors raised while configuring a pipeline or pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Concurrency must be at least 1.
    #[error("Invalid concurrency {0}: at least one worker is required")]
    InvalidConcurrency(usize),

    /// A sort key could not be used.
    #[error("Invalid sort key '{0}'")]
    InvalidSortKey(String),

    /// A sort direction string was not `asc` or `desc`.
    #[error("Invalid sort direction '{0}': expected 'asc' or 'desc'")]
    InvalidDirection(String),

    /// A synchronous pull reached a stage with pending async work.
    #[error("Stage '{0}' is asynchronous; drain it with an async terminal")]
    AsyncStage(&'static str),
}

/// The failure of a single element, tagged with its ordinal position.
#[derive(Debug, Error)]
#[error("Element {position} failed: {error}")]
pub struct ElementFailure {
    /// Zero-based ordinal position in pull order.
    pub position: usize,
    /// The callback's error.
    #[source]
    pub error: BoxError,
}

impl ElementFailure {
    /// Creates a new element failure.
    #[must_use]
    pub fn new(position: usize, error: BoxError) -> Self {
        Self { position, error }
    }
}

impl From<ElementFailure> for PipelineError {
    fn from(failure: ElementFailure) -> Self {
        Self::Element {
            position: failure.position,
            source: failure.error,
        }
    }
}

/// Every failure recorded by a collect-policy run.
#[derive(Debug, Error)]
#[error("{} of {total} elements failed", .failures.len())]
pub struct AggregateError {
    /// Number of ordinal positions that were pulled.
    pub total: usize,
    /// Failures ordered by position.
    pub failures: Vec<ElementFailure>,
}

impl AggregateError {
    /// Creates an aggregate error, ordering failures by position.
    #[must_use]
    pub fn new(total: usize, mut failures: Vec<ElementFailure>) -> Self {
        failures.sort_by_key(|f| f.position);
        Self { total, failures }
    }

    /// Returns the failed positions in ascending order.
    #[must_use]
    pub fn positions(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.position).collect()
    }
}
