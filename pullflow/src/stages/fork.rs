//! Side-channel consumption of each element.
//!
//! [`Fork`] passes every upstream element through unchanged. Before yielding
//! it, the element is lent to a callback as a one-element [`ForkView`]
//! pipeline. The view borrows the element, so it cannot outlive the pull
//! cycle that produced it.

use crate::errors::BoxError;
use crate::pipeline::Pipeline;
use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;

/// The inner view of a fork: yields the current outer element exactly once.
pub struct ForkView<'a, T> {
    value: &'a T,
    yielded: bool,
}

impl<'a, T> ForkView<'a, T> {
    /// Creates a view over one element.
    #[must_use]
    pub fn new(value: &'a T) -> Self {
        Self {
            value,
            yielded: false,
        }
    }

    /// The element this view yields.
    #[must_use]
    pub fn value(&self) -> &'a T {
        self.value
    }
}

impl<T> StreamNode for ForkView<'_, T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn pull(&mut self) -> PullResult<T> {
        if self.yielded {
            return Ok(Pull::Done);
        }
        self.yielded = true;
        Ok(Pull::Value(self.value.clone()))
    }

    fn restart(&mut self) {
        self.yielded = false;
    }

    fn is_async(&self) -> bool {
        false
    }
}

impl<T> fmt::Debug for ForkView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkView")
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}

/// The outer side of a fork.
pub struct Fork<S, F, E> {
    upstream: S,
    callback: F,
    is_async: bool,
    _error: PhantomData<fn() -> E>,
}

impl<S, F, E> Fork<S, F, E>
where
    S: StreamNode,
    S::Item: Clone + Sync,
    F: for<'a> FnMut(Pipeline<ForkView<'a, S::Item>>) -> Result<(), E>,
{
    /// Wraps `upstream`.
    pub fn new(upstream: S, callback: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            callback,
            is_async,
            _error: PhantomData,
        }
    }
}

impl<S, F, E> Fork<S, F, E>
where
    S: StreamNode,
    S::Item: Clone + Sync,
    F: for<'a> FnMut(Pipeline<ForkView<'a, S::Item>>) -> Result<(), E>,
    E: Into<BoxError>,
{
    fn lend(&mut self, pulled: Pull<S::Item>) -> PullResult<S::Item> {
        if let Pull::Value(v) = &pulled {
            (self.callback)(Pipeline::new(ForkView::new(v))).map_err(Into::<BoxError>::into)?;
        }
        Ok(pulled)
    }
}

#[async_trait]
impl<S, F, E> StreamNode for Fork<S, F, E>
where
    S: StreamNode,
    S::Item: Clone + Sync,
    F: for<'a> FnMut(Pipeline<ForkView<'a, S::Item>>) -> Result<(), E> + Send,
    E: Into<BoxError> + Send + 'static,
{
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        let pulled = self.upstream.pull()?;
        self.lend(pulled)
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        let pulled = self.upstream.pull_async().await?;
        self.lend(pulled)
    }

    fn restart(&mut self) {
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F, E> fmt::Debug for Fork<S, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fork")
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}
