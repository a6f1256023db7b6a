//! The pull protocol shared by every node in a pipeline.
//!
//! A chain is a singly-linked list of [`StreamNode`]s: each stage owns its
//! upstream and pulls from it on demand. Nothing happens until a terminal
//! operation pulls from the head of the chain.

mod deferred;

pub use deferred::Deferred;

use crate::errors::BoxError;
use async_trait::async_trait;

/// Result of a single pull.
///
/// The only value exchanged across the pull boundary. A pull both probes and
/// advances; there is no separate has-next check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull<T> {
    /// The next element.
    Value(T),
    /// The node is exhausted.
    Done,
}

impl<T> Pull<T> {
    /// Returns true if the node is exhausted.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Maps the contained value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Pull<U> {
        match self {
            Self::Value(v) => Pull::Value(f(v)),
            Self::Done => Pull::Done,
        }
    }

    /// Converts into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Done => None,
        }
    }
}

impl<T> From<Option<T>> for Pull<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Done, Self::Value)
    }
}

/// Result type returned by every pull.
pub type PullResult<T> = Result<Pull<T>, BoxError>;

/// Construction-time options for a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOptions {
    /// Treat the stage as asynchronous even if its upstream is not.
    pub is_async: bool,
}

impl StageOptions {
    /// Creates default (synchronous) options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a stage that performs async work.
    #[must_use]
    pub fn asynchronous() -> Self {
        Self { is_async: true }
    }

    /// Sets the async flag.
    #[must_use]
    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    /// Combines these options with the upstream's async flag.
    ///
    /// The result is monotonic: an async upstream always yields an async stage.
    #[must_use]
    pub fn resolve(self, upstream_is_async: bool) -> bool {
        upstream_is_async || self.is_async
    }
}

/// A node in a pull chain.
///
/// Contract:
/// - once [`Pull::Done`] is returned, every further pull returns `Done` until
///   [`restart`](Self::restart) is called;
/// - `restart` resets the node's own state and restarts its upstream, and no
///   cached results survive it;
/// - a node never pulls further ahead than its own semantics require.
#[async_trait]
pub trait StreamNode: Send {
    /// Element type produced by this node.
    type Item: Send + 'static;

    /// Pulls the next element synchronously.
    fn pull(&mut self) -> PullResult<Self::Item>;

    /// Pulls the next element, awaiting any upstream async work.
    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        self.pull()
    }

    /// Pulls the next position, leaving its per-element async work pending.
    ///
    /// Used by the worker pool: the pull itself happens under the pool's
    /// lock, the returned [`Deferred`] is settled outside it.
    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        Ok(self.pull_async().await?.map(Deferred::ready))
    }

    /// Rewinds the node to the start of its upstream.
    fn restart(&mut self);

    /// Whether this node (or anything upstream of it) is asynchronous.
    fn is_async(&self) -> bool;
}

#[async_trait]
impl<S: StreamNode + ?Sized> StreamNode for Box<S> {
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        (**self).pull()
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        (**self).pull_async().await
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        (**self).pull_deferred().await
    }

    fn restart(&mut self) {
        (**self).restart();
    }

    fn is_async(&self) -> bool {
        (**self).is_async()
    }
}
