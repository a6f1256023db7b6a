//! Side-effect stages that pass every element through unchanged.

use crate::errors::{BoxError, ConfigurationError};
use crate::stream::{Deferred, Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Calls `action` on every element as it passes.
pub struct ForEach<S, F> {
    upstream: S,
    action: Arc<F>,
    is_async: bool,
}

impl<S: StreamNode, F> ForEach<S, F> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, action: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            action: Arc::new(action),
            is_async,
        }
    }
}

#[async_trait]
impl<S, F> StreamNode for ForEach<S, F>
where
    S: StreamNode,
    F: Fn(&S::Item) + Send + Sync + 'static,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        let pulled = self.upstream.pull()?;
        if let Pull::Value(v) = &pulled {
            (self.action)(v);
        }
        Ok(pulled)
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        let pulled = self.upstream.pull_async().await?;
        if let Pull::Value(v) = &pulled {
            (self.action)(v);
        }
        Ok(pulled)
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        let action = Arc::clone(&self.action);
        Ok(self.upstream.pull_deferred().await?.map(|d| {
            d.then(move |v| {
                action(&v);
                Ok(Some(v))
            })
        }))
    }

    fn restart(&mut self) {
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F> fmt::Debug for ForEach<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEach")
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// Awaits a fallible async action on every element before passing it on.
pub struct ForEachAsync<S, F, E> {
    upstream: S,
    action: Arc<F>,
    _error: PhantomData<fn() -> E>,
}

impl<S: StreamNode, F, E> ForEachAsync<S, F, E> {
    /// Wraps `upstream`. The stage is always async.
    pub fn new(upstream: S, action: F) -> Self {
        Self {
            upstream,
            action: Arc::new(action),
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut, E> StreamNode for ForEachAsync<S, F, E>
where
    S: StreamNode,
    F: Fn(&S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        Err(ConfigurationError::AsyncStage("for_each_async").into())
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        let Pull::Value(v) = self.upstream.pull_async().await? else {
            return Ok(Pull::Done);
        };
        (self.action)(&v).await.map_err(Into::<BoxError>::into)?;
        Ok(Pull::Value(v))
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        let action = Arc::clone(&self.action);
        Ok(self.upstream.pull_deferred().await?.map(|d| {
            d.then_async(move |v| async move {
                action(&v).await.map_err(Into::<BoxError>::into)?;
                Ok(Some(v))
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

impl<S, F, E> fmt::Debug for ForEachAsync<S, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEachAsync").finish_non_exhaustive()
    }
}
