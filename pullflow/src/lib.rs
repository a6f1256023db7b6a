//! # Pullflow
//!
//! Lazy, pull-based sequence pipelines with bounded-concurrency draining.
//!
//! A [`Pipeline`](pipeline::Pipeline) is a chain of stages over a source.
//! Nothing runs until a terminal operation pulls values through it:
//!
//! - **Element-wise stages**: `filter`, `map`, `try_map`, `for_each` and their
//!   async variants, plus `map_many`
//! - **Structural stages**: `take`, `skip`, `distinct_by`, `group_by`, `sort_by`
//!   and `fork`
//! - **Sync terminals**: `to_array`, `to_dictionary`, `first`, `find`
//! - **Async terminals**: sequential draining or an ordered
//!   [`AsyncPool`](pool::AsyncPool) with fail-fast or collect error policies
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pullflow::prelude::*;
//!
//! let mut chain = Pipeline::from_iterable(0..100)
//!     .filter(|v| v % 3 == 0)
//!     .map_async(|v| async move { Ok::<_, BoxError>(fetch(v).await?) });
//!
//! let values = chain.to_array_async(PoolConfig::new().with_concurrency(8)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod pool;
pub mod sources;
pub mod stages;
pub mod stream;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::{
        AggregateError, BoxError, ConfigurationError, ElementFailure, PipelineError,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::Pipeline;
    pub use crate::pool::{AsyncPool, ErrorPolicy, PoolConfig, PoolOutcome, Settled};
    pub use crate::sources::{FactorySource, IterSource};
    pub use crate::stages::{Direction, ForkView, Group};
    pub use crate::stream::{Deferred, Pull, PullResult, StageOptions, StreamNode};
}
