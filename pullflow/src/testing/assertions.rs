//! Test assertions for pipeline results.

use crate::errors::PipelineError;
use crate::pool::PoolOutcome;

/// Asserts that a pool outcome accounts for exactly `expected` positions,
/// each as either a value or a failure.
pub fn assert_outcome_complete<T>(outcome: &PoolOutcome<T>, expected: usize) {
    assert_eq!(
        outcome.pulled(),
        expected,
        "Expected {} pulled positions, got {}",
        expected,
        outcome.pulled()
    );
    assert_eq!(
        outcome.len(),
        expected,
        "Expected every position to be listed, got {} of {}",
        outcome.len(),
        expected
    );

    let positions: Vec<usize> = outcome.failures().map(|f| f.position).collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "Failure positions out of order: {positions:?}"
    );
    assert!(
        positions.iter().all(|p| *p < expected),
        "Failure position out of range: {positions:?}"
    );
}

/// Asserts that an error names the failing element at `position`.
pub fn assert_element_error(err: &PipelineError, position: usize) {
    assert!(
        matches!(err, PipelineError::Element { .. }),
        "Expected an element error, got: {err}"
    );
    assert_eq!(
        err.position(),
        Some(position),
        "Expected failure at position {}, got: {}",
        position,
        err
    );
}
