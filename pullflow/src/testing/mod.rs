//! Testing utilities for pullflow pipelines.
//!
//! This module provides:
//! - A probe node that counts pulls and restarts
//! - A counter for matcher and predicate calls
//! - Latency and failure fixtures for pool tests
//! - Assertions for pool outcomes and element errors

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_element_error, assert_outcome_complete};
pub use fixtures::{fail_on, reversed_latency, InjectedFailure, LATENCY_STEP};
pub use mocks::{CallCounter, ProbeStats, PullProbe};
