//! Element-wise transforms.

use crate::errors::{BoxError, ConfigurationError};
use crate::stream::{Deferred, Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Applies an infallible transform to every element.
pub struct Map<S, F> {
    upstream: S,
    transform: Arc<F>,
    is_async: bool,
}

impl<S: StreamNode, F> Map<S, F> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, transform: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            transform: Arc::new(transform),
            is_async,
        }
    }
}

#[async_trait]
impl<S, F, U> StreamNode for Map<S, F>
where
    S: StreamNode,
    F: Fn(S::Item) -> U + Send + Sync + 'static,
    U: Send + 'static,
{
    type Item = U;

    fn pull(&mut self) -> PullResult<U> {
        Ok(self.upstream.pull()?.map(|v| (self.transform)(v)))
    }

    async fn pull_async(&mut self) -> PullResult<U> {
        Ok(self.upstream.pull_async().await?.map(|v| (self.transform)(v)))
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<U>> {
        let transform = Arc::clone(&self.transform);
        Ok(self
            .upstream
            .pull_deferred()
            .await?
            .map(|d| d.then(move |v| Ok(Some(transform(v))))))
    }

    fn restart(&mut self) {
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F> fmt::Debug for Map<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// Applies a fallible transform to every element.
pub struct TryMap<S, F, E> {
    upstream: S,
    transform: Arc<F>,
    is_async: bool,
    _error: PhantomData<fn() -> E>,
}

impl<S: StreamNode, F, E> TryMap<S, F, E> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, transform: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            transform: Arc::new(transform),
            is_async,
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, U, E> StreamNode for TryMap<S, F, E>
where
    S: StreamNode,
    F: Fn(S::Item) -> Result<U, E> + Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Item = U;

    fn pull(&mut self) -> PullResult<U> {
        match self.upstream.pull()? {
            Pull::Value(v) => Ok(Pull::Value((self.transform)(v).map_err(Into::<BoxError>::into)?)),
            Pull::Done => Ok(Pull::Done),
        }
    }

    async fn pull_async(&mut self) -> PullResult<U> {
        match self.upstream.pull_async().await? {
            Pull::Value(v) => Ok(Pull::Value((self.transform)(v).map_err(Into::<BoxError>::into)?)),
            Pull::Done => Ok(Pull::Done),
        }
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<U>> {
        let transform = Arc::clone(&self.transform);
        Ok(self
            .upstream
            .pull_deferred()
            .await?
            .map(|d| d.then(move |v| transform(v).map(Some).map_err(Into::into))))
    }

    fn restart(&mut self) {
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S, F, E> fmt::Debug for TryMap<S, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryMap")
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// Applies an async, fallible transform to every element.
///
/// Under the worker pool the transform runs outside the pull lock, which is
/// where the pool gets its concurrency from.
pub struct MapAsync<S, F, E> {
    upstream: S,
    transform: Arc<F>,
    _error: PhantomData<fn() -> E>,
}

impl<S: StreamNode, F, E> MapAsync<S, F, E> {
    /// Wraps `upstream`. The stage is always async.
    pub fn new(upstream: S, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut, U, E> StreamNode for MapAsync<S, F, E>
where
    S: StreamNode,
    F: Fn(S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
    U: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Item = U;

    fn pull(&mut self) -> PullResult<U> {
        Err(ConfigurationError::AsyncStage("map_async").into())
    }

    async fn pull_async(&mut self) -> PullResult<U> {
        match self.upstream.pull_async().await? {
            Pull::Value(v) => {
                let mapped = (self.transform)(v).await.map_err(Into::<BoxError>::into)?;
                Ok(Pull::Value(mapped))
            }
            Pull::Done => Ok(Pull::Done),
        }
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<U>> {
        let transform = Arc::clone(&self.transform);
        Ok(self.upstream.pull_deferred().await?.map(|d| {
            d.then_async(move |v| async move {
                transform(v).await.map(Some).map_err(Into::into)
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

impl<S, F, E> fmt::Debug for MapAsync<S, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapAsync").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::IterSource;

    #[test]
    fn test_map_sync() {
        let mut stage = Map::new(IterSource::new(vec![1, 2]), |v: i32| v * 2, StageOptions::new());
        assert_eq!(stage.pull().unwrap(), Pull::Value(2));
        assert_eq!(stage.pull().unwrap(), Pull::Value(4));
        assert!(stage.pull().unwrap().is_done());
        assert!(!stage.is_async());
    }

    #[test]
    fn test_map_marked_async() {
        let stage = Map::new(IterSource::new(vec![1]), |v: i32| v, StageOptions::asynchronous());
        assert!(stage.is_async());
    }

    #[test]
    fn test_try_map_propagates_error() {
        let mut stage = TryMap::<_, _, &str>::new(
            IterSource::new(vec![1, 0, 2]),
            |v: i32| if v == 0 { Err("zero") } else { Ok(10 / v) },
            StageOptions::new(),
        );

        assert_eq!(stage.pull().unwrap(), Pull::Value(10));
        assert_eq!(stage.pull().unwrap_err().to_string(), "zero");
        assert_eq!(stage.pull().unwrap(), Pull::Value(5));
    }

    #[tokio::test]
    async fn test_map_async_defers_work() {
        let mut stage = MapAsync::<_, _, BoxError>::new(IterSource::new(vec![3]), |v: i32| async move {
            Ok::<_, BoxError>(v + 1)
        });

        assert!(stage.pull().is_err());

        let deferred = stage.pull_deferred().await.unwrap().into_option().unwrap();
        assert!(!deferred.is_ready());
        assert_eq!(deferred.settle().await.unwrap(), Some(4));
        assert!(stage.pull_deferred().await.unwrap().is_done());
    }

    #[tokio::test]
    async fn test_map_after_map_async_composes_deferred() {
        let inner = MapAsync::<_, _, BoxError>::new(IterSource::new(vec![1, 2]), |v: i32| async move {
            Ok::<_, BoxError>(v * 10)
        });
        let mut stage = Map::new(inner, |v: i32| v + 1, StageOptions::new());

        assert!(stage.is_async());
        let deferred = stage.pull_deferred().await.unwrap().into_option().unwrap();
        assert_eq!(deferred.settle().await.unwrap(), Some(11));
        assert_eq!(stage.pull_async().await.unwrap(), Pull::Value(21));
    }
}
