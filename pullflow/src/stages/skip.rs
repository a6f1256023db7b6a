//! Stages that drop a prefix of the upstream.

use crate::errors::BoxError;
use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::fmt;

/// Drops the first `count` elements.
///
/// A failed upstream pull counts as one of the dropped positions, so the
/// element that fails is not replaced by a later one.
#[derive(Debug)]
pub struct Skip<S> {
    upstream: S,
    count: usize,
    skipped: usize,
    is_async: bool,
}

impl<S: StreamNode> Skip<S> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, count: usize, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            count,
            skipped: 0,
            is_async,
        }
    }

    /// Counts one skipped position. Returns true once the upstream is done.
    fn consume(&mut self, pulled: PullResult<S::Item>) -> Result<bool, BoxError> {
        if matches!(pulled, Ok(Pull::Done)) {
            return Ok(true);
        }
        self.skipped += 1;
        pulled.map(|_| false)
    }
}

#[async_trait]
impl<S: StreamNode> StreamNode for Skip<S> {
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        while self.skipped < self.count {
            let pulled = self.upstream.pull();
            if self.consume(pulled)? {
                return Ok(Pull::Done);
            }
        }
        self.upstream.pull()
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        while self.skipped < self.count {
            let pulled = self.upstream.pull_async().await;
            if self.consume(pulled)? {
                return Ok(Pull::Done);
            }
        }
        self.upstream.pull_async().await
    }

    fn restart(&mut self) {
        self.skipped = 0;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

/// Drops elements while `predicate` holds, then yields everything after.
pub struct SkipWhile<S, F> {
    upstream: S,
    predicate: F,
    skipping: bool,
    is_async: bool,
}

impl<S: StreamNode, F> SkipWhile<S, F> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, predicate: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            predicate,
            skipping: true,
            is_async,
        }
    }
}

#[async_trait]
impl<S, F> StreamNode for SkipWhile<S, F>
where
    S: StreamNode,
    F: FnMut(&S::Item) -> bool + Send,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        loop {
            match self.upstream.pull()? {
                Pull::Value(v) if self.skipping && (self.predicate)(&v) => {}
                pulled => {
                    self.skipping = false;
                    return Ok(pulled);
                }
            }
        }
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        loop {
            match self.upstream.pull_async().await? {
                Pull::Value(v) if self.skipping && (self.predicate)(&v) => {}
                pulled => {
                    self.skipping = false;
                    return Ok(pulled);
                }
            }
        }
    }

    fn restart(&mut self) {
        self.skipping = true;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F> fmt::Debug for SkipWhile<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipWhile")
            .field("skipping", &self.skipping)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::IterSource;

    #[test]
    fn test_skip() {
        let mut stage = Skip::new(IterSource::new(1..=4), 2, StageOptions::new());
        assert_eq!(stage.pull().unwrap(), Pull::Value(3));
        assert_eq!(stage.pull().unwrap(), Pull::Value(4));
        assert!(stage.pull().unwrap().is_done());
    }

    #[test]
    fn test_skip_more_than_available() {
        let mut stage = Skip::new(IterSource::new(1..=2), 5, StageOptions::new());
        assert!(stage.pull().unwrap().is_done());
        assert!(stage.pull().unwrap().is_done());
    }

    #[test]
    fn test_skip_counts_failed_pull_as_skipped() {
        let upstream = crate::stages::TryMap::<_, _, &str>::new(
            IterSource::new(vec![1, 0, 2, 3]),
            |v: i32| if v == 0 { Err("zero") } else { Ok(v) },
            StageOptions::new(),
        );
        let mut stage = Skip::new(upstream, 2, StageOptions::new());

        assert!(stage.pull().is_err());
        assert_eq!(stage.pull().unwrap(), Pull::Value(2));
        assert_eq!(stage.pull().unwrap(), Pull::Value(3));
        assert!(stage.pull().unwrap().is_done());
    }

    #[test]
    fn test_skip_while_only_skips_leading_run() {
        let mut stage = SkipWhile::new(IterSource::new(vec![1, 1, 2, 1]), |v: &i32| *v == 1, StageOptions::new());

        assert_eq!(stage.pull().unwrap(), Pull::Value(2));
        assert_eq!(stage.pull().unwrap(), Pull::Value(1));
        assert!(stage.pull().unwrap().is_done());

        stage.restart();
        assert_eq!(stage.pull().unwrap(), Pull::Value(2));
    }
}
