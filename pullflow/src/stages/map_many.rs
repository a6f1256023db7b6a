//! Flattening stages.
//!
//! Only the batch produced by the most recent upstream element is buffered.

use crate::errors::{BoxError, ConfigurationError};
use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// Maps every element to an iterable and yields its items in order.
pub struct MapMany<S, F, I: IntoIterator> {
    upstream: S,
    expand: F,
    batch: Option<I::IntoIter>,
    is_async: bool,
}

impl<S, F, I> MapMany<S, F, I>
where
    S: StreamNode,
    F: FnMut(S::Item) -> I,
    I: IntoIterator,
{
    /// Wraps `upstream`.
    pub fn new(upstream: S, expand: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            expand,
            batch: None,
            is_async,
        }
    }

    fn next_buffered(&mut self) -> Option<I::Item> {
        let item = self.batch.as_mut()?.next();
        if item.is_none() {
            self.batch = None;
        }
        item
    }
}

#[async_trait]
impl<S, F, I> StreamNode for MapMany<S, F, I>
where
    S: StreamNode,
    F: FnMut(S::Item) -> I + Send,
    I: IntoIterator + Send,
    I::IntoIter: Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        loop {
            if let Some(item) = self.next_buffered() {
                return Ok(Pull::Value(item));
            }
            match self.upstream.pull()? {
                Pull::Value(v) => self.batch = Some((self.expand)(v).into_iter()),
                Pull::Done => return Ok(Pull::Done),
            }
        }
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        loop {
            if let Some(item) = self.next_buffered() {
                return Ok(Pull::Value(item));
            }
            match self.upstream.pull_async().await? {
                Pull::Value(v) => self.batch = Some((self.expand)(v).into_iter()),
                Pull::Done => return Ok(Pull::Done),
            }
        }
    }

    fn restart(&mut self) {
        self.batch = None;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F, I: IntoIterator> fmt::Debug for MapMany<S, F, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapMany")
            .field("buffering", &self.batch.is_some())
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// Like [`MapMany`], with an async, fallible expansion.
pub struct MapManyAsync<S, F, I: IntoIterator, E> {
    upstream: S,
    expand: F,
    batch: Option<I::IntoIter>,
    _error: PhantomData<fn() -> E>,
}

impl<S: StreamNode, F, I: IntoIterator, E> MapManyAsync<S, F, I, E> {
    /// Wraps `upstream`. The stage is always async.
    pub fn new<Fut>(upstream: S, expand: F) -> Self
    where
        F: FnMut(S::Item) -> Fut,
        Fut: Future<Output = Result<I, E>>,
    {
        Self {
            upstream,
            expand,
            batch: None,
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut, I, E> StreamNode for MapManyAsync<S, F, I, E>
where
    S: StreamNode,
    F: FnMut(S::Item) -> Fut + Send,
    Fut: Future<Output = Result<I, E>> + Send + 'static,
    I: IntoIterator + Send,
    I::IntoIter: Send,
    I::Item: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Item = I::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        Err(ConfigurationError::AsyncStage("map_many_async").into())
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        loop {
            if let Some(batch) = self.batch.as_mut() {
                if let Some(item) = batch.next() {
                    return Ok(Pull::Value(item));
                }
                self.batch = None;
            }
            let Pull::Value(v) = self.upstream.pull_async().await? else {
                return Ok(Pull::Done);
            };
            let expanded = (self.expand)(v).await.map_err(Into::<BoxError>::into)?;
            self.batch = Some(expanded.into_iter());
        }
    }

    fn restart(&mut self) {
        self.batch = None;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        true
    }
}

impl<S, F, I: IntoIterator, E> fmt::Debug for MapManyAsync<S, F, I, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapManyAsync")
            .field("buffering", &self.batch.is_some())
            .finish_non_exhaustive()
    }
}
