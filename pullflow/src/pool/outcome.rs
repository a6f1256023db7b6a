//! Per-position results of a pool run.

use crate::errors::{AggregateError, ElementFailure};

/// The settled state of one ordinal position.
#[derive(Debug)]
pub enum Settled<T> {
    /// The element's work succeeded.
    Value(T),
    /// The element's work failed.
    Failed(ElementFailure),
}

impl<T> Settled<T> {
    /// Returns the value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&ElementFailure> {
        match self {
            Self::Value(_) => None,
            Self::Failed(f) => Some(f),
        }
    }

    /// Returns true if this position failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Everything a pool run produced, in pull order.
///
/// Positions suppressed by an async filter are not listed, every other pulled
/// position is, as either a value or a failure. Failures carry their own
/// position; [`pulled`](Self::pulled) counts suppressed positions too.
#[derive(Debug)]
pub struct PoolOutcome<T> {
    pulled: usize,
    settled: Vec<Settled<T>>,
}

impl<T> PoolOutcome<T> {
    pub(crate) fn new(pulled: usize, settled: Vec<Settled<T>>) -> Self {
        Self { pulled, settled }
    }

    /// Number of ordinal positions pulled from the chain.
    #[must_use]
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    /// Number of listed positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    /// Returns true if nothing was listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }

    /// The listed positions, in pull order.
    #[must_use]
    pub fn settled(&self) -> &[Settled<T>] {
        &self.settled
    }

    /// Iterates over successful values in pull order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.settled.iter().filter_map(Settled::value)
    }

    /// Iterates over failures in position order.
    pub fn failures(&self) -> impl Iterator<Item = &ElementFailure> {
        self.settled.iter().filter_map(Settled::failure)
    }

    /// Returns true if any position failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.settled.iter().any(Settled::is_failed)
    }

    /// Consumes the outcome, returning the listed positions.
    #[must_use]
    pub fn into_settled(self) -> Vec<Settled<T>> {
        self.settled
    }

    /// Returns the values if nothing failed, otherwise every failure.
    pub fn into_values(self) -> Result<Vec<T>, AggregateError> {
        let mut values = Vec::with_capacity(self.settled.len());
        let mut failures = Vec::new();
        for settled in self.settled {
            match settled {
                Settled::Value(v) => values.push(v),
                Settled::Failed(f) => failures.push(f),
            }
        }
        if failures.is_empty() {
            Ok(values)
        } else {
            Err(AggregateError::new(self.pulled, failures))
        }
    }
}
