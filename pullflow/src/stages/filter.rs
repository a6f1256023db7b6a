//! Filter stages.

use crate::errors::{BoxError, ConfigurationError};
use crate::stream::{Deferred, Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Yields only the upstream elements matching a predicate.
pub struct Filter<S, F> {
    upstream: S,
    predicate: Arc<F>,
    is_async: bool,
}

impl<S: StreamNode, F> Filter<S, F> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, predicate: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            predicate: Arc::new(predicate),
            is_async,
        }
    }
}

#[async_trait]
impl<S, F> StreamNode for Filter<S, F>
where
    S: StreamNode,
    F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        loop {
            match self.upstream.pull()? {
                Pull::Value(v) if (self.predicate)(&v) => return Ok(Pull::Value(v)),
                Pull::Value(_) => {}
                Pull::Done => return Ok(Pull::Done),
            }
        }
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        loop {
            match self.upstream.pull_async().await? {
                Pull::Value(v) if (self.predicate)(&v) => return Ok(Pull::Value(v)),
                Pull::Value(_) => {}
                Pull::Done => return Ok(Pull::Done),
            }
        }
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        let predicate = Arc::clone(&self.predicate);
        Ok(self
            .upstream
            .pull_deferred()
            .await?
            .map(|d| d.then(move |v| Ok(predicate(&v).then_some(v)))))
    }

    fn restart(&mut self) {
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F> fmt::Debug for Filter<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// Filter whose predicate is asynchronous and fallible.
///
/// The predicate borrows the element and returns an owned future, so it must
/// copy whatever it needs out of the element before the `async` block.
pub struct FilterAsync<S, F, E> {
    upstream: S,
    predicate: Arc<F>,
    _error: PhantomData<fn() -> E>,
}

impl<S: StreamNode, F, E> FilterAsync<S, F, E> {
    /// Wraps `upstream`. The stage is always async.
    pub fn new(upstream: S, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut, E> StreamNode for FilterAsync<S, F, E>
where
    S: StreamNode,
    F: Fn(&S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        Err(ConfigurationError::AsyncStage("filter_async").into())
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        loop {
            let Pull::Value(v) = self.upstream.pull_async().await? else {
                return Ok(Pull::Done);
            };
            if (self.predicate)(&v).await.map_err(Into::<BoxError>::into)? {
                return Ok(Pull::Value(v));
            }
        }
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        let predicate = Arc::clone(&self.predicate);
        Ok(self.upstream.pull_deferred().await?.map(|d| {
            d.then_async(move |v| async move {
                let keep = predicate(&v).await.map_err(Into::<BoxError>::into)?;
                Ok(keep.then_some(v))
            })
        }))
    }

    fn restart(&mut self) {
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        true
    }
}

impl<S, F, E> fmt::Debug for FilterAsync<S, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterAsync").finish_non_exhaustive()
    }
}
