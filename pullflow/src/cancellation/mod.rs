//! Cooperative cancellation for pool runs.

mod token;

pub use token::CancellationToken;
