//! Fixtures for pipeline tests.

use std::time::Duration;
use thiserror::Error;

/// Base delay unit for [`reversed_latency`].
pub const LATENCY_STEP: Duration = Duration::from_millis(2);

/// Latency for element `position` out of `total` such that later elements
/// finish first.
#[must_use]
pub fn reversed_latency(position: u64, total: u64) -> Duration {
    let remaining = total.saturating_sub(position);
    LATENCY_STEP * u32::try_from(remaining).unwrap_or(u32::MAX)
}

/// A deliberate failure tied to an element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("element {0} failed on purpose")]
pub struct InjectedFailure(pub u64);

/// Identity that fails on `bad` elements.
pub fn fail_on(value: u64, bad: u64) -> Result<u64, InjectedFailure> {
    if value == bad {
        Err(InjectedFailure(value))
    } else {
        Ok(value)
    }
}
