//! Prefix stages: `take` and `take_while`.
//!
//! Both stop pulling their upstream as soon as the prefix has ended.

use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;

/// Yields at most `limit` positions.
///
/// A failed upstream pull uses up one of the `limit` positions.
#[derive(Debug)]
pub struct Take<S> {
    upstream: S,
    limit: usize,
    taken: usize,
    is_async: bool,
}

impl<S: StreamNode> Take<S> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, limit: usize, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            limit,
            taken: 0,
            is_async,
        }
    }

    fn record(&mut self, pulled: PullResult<S::Item>) -> PullResult<S::Item> {
        if !matches!(pulled, Ok(Pull::Done)) {
            self.taken += 1;
        }
        pulled
    }
}

#[async_trait]
impl<S: StreamNode> StreamNode for Take<S> {
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        if self.taken >= self.limit {
            return Ok(Pull::Done);
        }
        let pulled = self.upstream.pull();
        self.record(pulled)
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        if self.taken >= self.limit {
            return Ok(Pull::Done);
        }
        let pulled = self.upstream.pull_async().await;
        self.record(pulled)
    }

    fn restart(&mut self) {
        self.taken = 0;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

/// Yields elements while `predicate` holds, then ends.
pub struct TakeWhile<S, F> {
    upstream: S,
    predicate: F,
    done: bool,
    is_async: bool,
}

impl<S: StreamNode, F> TakeWhile<S, F> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, predicate: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            predicate,
            done: false,
            is_async,
        }
    }
}

impl<S: StreamNode, F: FnMut(&S::Item) -> bool> TakeWhile<S, F> {
    fn check(&mut self, pulled: Pull<S::Item>) -> Pull<S::Item> {
        match pulled {
            Pull::Value(v) if (self.predicate)(&v) => Pull::Value(v),
            _ => {
                self.done = true;
                Pull::Done
            }
        }
    }
}

#[async_trait]
impl<S, F> StreamNode for TakeWhile<S, F>
where
    S: StreamNode,
    F: FnMut(&S::Item) -> bool + Send,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        if self.done {
            return Ok(Pull::Done);
        }
        let pulled = self.upstream.pull()?;
        Ok(self.check(pulled))
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        if self.done {
            return Ok(Pull::Done);
        }
        let pulled = self.upstream.pull_async().await?;
        Ok(self.check(pulled))
    }

    fn restart(&mut self) {
        self.done = false;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F> std::fmt::Debug for TakeWhile<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TakeWhile")
            .field("done", &self.done)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}
