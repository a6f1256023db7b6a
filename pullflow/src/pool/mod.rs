//! Bounded-concurrency draining of a single pull chain.
//!
//! `concurrency` workers share one chain. Pulling is serialized behind an
//! async mutex and only hands out [`Deferred`] work plus an ordinal
//! position; each worker then settles its element without holding the lock
//! and writes the outcome into the slot reserved for that position. Output
//! order is therefore pull order, whatever order the work finishes in.
//!
//! Workers are polled concurrently on the caller's task, so the chain never
//! has to be `'static` and nothing is spawned.

mod config;
mod outcome;

pub use config::{ErrorPolicy, PoolConfig};
pub use outcome::{PoolOutcome, Settled};

use crate::cancellation::CancellationToken;
use crate::errors::{BoxError, ConfigurationError, ElementFailure, PipelineError};
use crate::stream::{Deferred, Pull, StreamNode};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Per-position state while a run is in progress.
enum Slot<T> {
    /// Pulled, work not settled yet.
    Reserved,
    Value(T),
    /// Dropped by an async filter.
    Suppressed,
    Failed(ElementFailure),
}

struct Cursor<'a, S> {
    node: &'a mut S,
    next_position: usize,
    exhausted: bool,
}

struct Shared<'a, S: StreamNode> {
    cursor: tokio::sync::Mutex<Cursor<'a, S>>,
    slots: Mutex<Vec<Slot<S::Item>>>,
    first_failure: Mutex<Option<ElementFailure>>,
    token: CancellationToken,
    policy: ErrorPolicy,
}

impl<S: StreamNode> Shared<'_, S> {
    /// Takes the next position from the chain, or `None` once the run is over.
    async fn next(&self) -> Option<(usize, Deferred<S::Item>)> {
        let mut cursor = self.cursor.lock().await;
        if cursor.exhausted || self.token.is_cancelled() {
            return None;
        }
        let deferred = match cursor.node.pull_deferred().await {
            Ok(Pull::Value(deferred)) => deferred,
            Ok(Pull::Done) => {
                cursor.exhausted = true;
                return None;
            }
            Err(e) => Deferred::failed(e),
        };
        let position = cursor.next_position;
        cursor.next_position += 1;
        self.slots.lock().push(Slot::Reserved);
        Some((position, deferred))
    }

    fn record(&self, position: usize, settled: Result<Option<S::Item>, BoxError>) {
        let slot = match settled {
            Ok(Some(value)) => Slot::Value(value),
            Ok(None) => Slot::Suppressed,
            Err(error) => {
                warn!(position, error = %error, policy = %self.policy, "Element failed");
                let failure = ElementFailure::new(position, error);
                if self.policy == ErrorPolicy::FailFast {
                    let mut first = self.first_failure.lock();
                    if first.is_none() {
                        self.token.cancel(format!("element {position} failed"));
                        *first = Some(failure);
                    }
                    return;
                }
                Slot::Failed(failure)
            }
        };
        if self.policy == ErrorPolicy::FailFast && self.token.is_cancelled() {
            return;
        }
        self.slots.lock()[position] = slot;
    }

    async fn work(&self, worker: usize) {
        let mut settled_count = 0usize;
        while let Some((position, deferred)) = self.next().await {
            let settled = AssertUnwindSafe(deferred.settle())
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panic_message(panic.as_ref()).into()));
            self.record(position, settled);
            settled_count += 1;
        }
        debug!(worker, settled = settled_count, "Pool worker exiting");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("panicked: {detail}")
}

/// A fixed-size worker pool that drains one chain.
#[derive(Debug, Clone, Copy)]
pub struct AsyncPool {
    config: PoolConfig,
}

impl AsyncPool {
    /// Creates a pool, validating `config`.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The pool's configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Restarts `node` and drains it.
    ///
    /// Under [`ErrorPolicy::FailFast`] the first failure stops further pulls
    /// and is returned as [`PipelineError::Element`]; work still in flight is
    /// awaited but its result discarded. Under [`ErrorPolicy::Collect`] the
    /// outcome lists every pulled position as a value or a failure.
    ///
    /// A panic inside an element's deferred work is recorded as that
    /// element's failure. A panic while pulling propagates.
    pub async fn run<S: StreamNode>(&self, node: &mut S) -> Result<PoolOutcome<S::Item>, PipelineError> {
        node.restart();
        debug!(
            concurrency = self.config.concurrency,
            policy = %self.config.error_policy,
            "Starting pool run"
        );

        let shared = Shared {
            cursor: tokio::sync::Mutex::new(Cursor {
                node,
                next_position: 0,
                exhausted: false,
            }),
            slots: Mutex::new(Vec::new()),
            first_failure: Mutex::new(None),
            token: CancellationToken::new(),
            policy: self.config.error_policy,
        };

        let mut workers: FuturesUnordered<_> = (0..self.config.concurrency)
            .map(|worker| shared.work(worker))
            .collect();
        while workers.next().await.is_some() {}
        drop(workers);

        if let Some(failure) = shared.first_failure.into_inner() {
            debug!(
                position = failure.position,
                reason = ?shared.token.reason(),
                "Pool run cancelled"
            );
            return Err(failure.into());
        }

        let slots = shared.slots.into_inner();
        let pulled = slots.len();
        let mut settled = Vec::with_capacity(pulled);
        for (position, slot) in slots.into_iter().enumerate() {
            match slot {
                Slot::Value(v) => settled.push(Settled::Value(v)),
                Slot::Failed(f) => settled.push(Settled::Failed(f)),
                Slot::Suppressed => {}
                Slot::Reserved => {
                    return Err(PipelineError::Internal(format!(
                        "position {position} was pulled but never settled"
                    )));
                }
            }
        }
        debug!(pulled, listed = settled.len(), "Pool run finished");
        Ok(PoolOutcome::new(pulled, settled))
    }
}
