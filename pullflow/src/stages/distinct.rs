//! De-duplication by key. The first occurrence of each key wins.

use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Yields only elements whose key has not been seen since the last restart.
pub struct DistinctBy<S, F, K> {
    upstream: S,
    key_fn: F,
    seen: HashSet<K>,
    is_async: bool,
}

impl<S, F, K> DistinctBy<S, F, K>
where
    S: StreamNode,
    F: FnMut(&S::Item) -> K,
    K: Hash + Eq,
{
    /// Wraps `upstream`.
    pub fn new(upstream: S, key_fn: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            key_fn,
            seen: HashSet::new(),
            is_async,
        }
    }

    fn is_first(&mut self, value: &S::Item) -> bool {
        self.seen.insert((self.key_fn)(value))
    }
}

#[async_trait]
impl<S, F, K> StreamNode for DistinctBy<S, F, K>
where
    S: StreamNode,
    F: FnMut(&S::Item) -> K + Send,
    K: Hash + Eq + Send,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        loop {
            match self.upstream.pull()? {
                Pull::Value(v) if !self.is_first(&v) => {}
                pulled => return Ok(pulled),
            }
        }
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        loop {
            match self.upstream.pull_async().await? {
                Pull::Value(v) if !self.is_first(&v) => {}
                pulled => return Ok(pulled),
            }
        }
    }

    fn restart(&mut self) {
        self.seen.clear();
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F, K> fmt::Debug for DistinctBy<S, F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistinctBy")
            .field("seen", &self.seen.len())
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}
