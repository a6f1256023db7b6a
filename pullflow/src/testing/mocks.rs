//! Instrumented nodes and callbacks for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::stream::{Deferred, PullResult, StreamNode};

/// Shared pull and restart counters of a [`PullProbe`].
///
/// Cloning the stats shares the counters, so they can still be read after
/// the probe itself has been moved into a chain.
#[derive(Debug, Clone, Default)]
pub struct ProbeStats {
    pulls: Arc<AtomicUsize>,
    restarts: Arc<AtomicUsize>,
}

impl ProbeStats {
    /// Number of pulls of any kind.
    #[must_use]
    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Number of restarts.
    #[must_use]
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

/// Wraps a node and counts how often it is pulled and restarted.
#[derive(Debug)]
pub struct PullProbe<S> {
    inner: S,
    stats: ProbeStats,
}

impl<S: StreamNode> PullProbe<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: ProbeStats::default(),
        }
    }

    /// Returns a handle to the counters.
    #[must_use]
    pub fn stats(&self) -> ProbeStats {
        self.stats.clone()
    }

    /// Number of pulls so far.
    #[must_use]
    pub fn pulls(&self) -> usize {
        self.stats.pulls()
    }

    fn count(&self) {
        self.stats.pulls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: StreamNode> StreamNode for PullProbe<S> {
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        self.count();
        self.inner.pull()
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        self.count();
        self.inner.pull_async().await
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        self.count();
        self.inner.pull_deferred().await
    }

    fn restart(&mut self) {
        self.stats.restarts.fetch_add(1, Ordering::SeqCst);
        self.inner.restart();
    }

    fn is_async(&self) -> bool {
        self.inner.is_async()
    }
}

/// Counts invocations of wrapped callbacks.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wraps a terminal matcher such as the one taken by `find`.
    pub fn matcher<T, F>(&self, mut matcher: F) -> impl FnMut(&T, usize) -> bool
    where
        F: FnMut(&T, usize) -> bool,
    {
        let calls = Arc::clone(&self.calls);
        move |value: &T, index: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
            matcher(value, index)
        }
    }

    /// Wraps a stage predicate such as the one taken by `filter`.
    pub fn predicate<T, F>(&self, predicate: F) -> impl Fn(&T) -> bool + Send + Sync + 'static
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let calls = Arc::clone(&self.calls);
        move |value: &T| {
            calls.fetch_add(1, Ordering::SeqCst);
            predicate(value)
        }
    }
}
