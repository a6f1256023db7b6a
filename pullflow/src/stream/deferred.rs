//! Pending per-element work handed from the shared chain to pool workers.

use crate::errors::BoxError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;

enum Inner<T> {
    /// Already settled. `None` means an upstream filter suppressed the element.
    Ready(Result<Option<T>, BoxError>),
    /// Work that still has to be awaited.
    Pending(BoxFuture<'static, Result<Option<T>, BoxError>>),
}

/// The outcome of one pulled position whose async work may not have run yet.
///
/// Element-wise stages compose onto a `Deferred` with [`then`](Self::then)
/// and [`then_async`](Self::then_async). Settled values stay settled: a sync
/// continuation on a ready value runs immediately, so no suspension is added
/// to chains without async work.
pub struct Deferred<T>(Inner<T>);

impl<T: Send + 'static> Deferred<T> {
    /// A settled value.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self(Inner::Ready(Ok(Some(value))))
    }

    /// A position suppressed by a filter.
    #[must_use]
    pub fn suppressed() -> Self {
        Self(Inner::Ready(Ok(None)))
    }

    /// A settled failure.
    #[must_use]
    pub fn failed(error: BoxError) -> Self {
        Self(Inner::Ready(Err(error)))
    }

    /// Wraps a future that resolves to the element (or its suppression).
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<T>, BoxError>> + Send + 'static,
    {
        Self(Inner::Pending(future.boxed()))
    }

    /// Returns true if no async work remains.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.0, Inner::Ready(_))
    }

    /// Applies a synchronous continuation to the element once it is settled.
    ///
    /// The continuation may suppress the element by returning `Ok(None)`.
    pub fn then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<Option<U>, BoxError> + Send + 'static,
    {
        match self.0 {
            Inner::Ready(Ok(Some(value))) => Deferred(Inner::Ready(f(value))),
            Inner::Ready(Ok(None)) => Deferred::suppressed(),
            Inner::Ready(Err(e)) => Deferred::failed(e),
            Inner::Pending(fut) => Deferred::pending(async move {
                match fut.await? {
                    Some(value) => f(value),
                    None => Ok(None),
                }
            }),
        }
    }

    /// Chains async work onto the element.
    pub fn then_async<U, F, Fut>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<U>, BoxError>> + Send + 'static,
    {
        match self.0 {
            Inner::Ready(Ok(Some(value))) => Deferred::pending(f(value)),
            Inner::Ready(Ok(None)) => Deferred::suppressed(),
            Inner::Ready(Err(e)) => Deferred::failed(e),
            Inner::Pending(fut) => Deferred::pending(async move {
                match fut.await? {
                    Some(value) => f(value).await,
                    None => Ok(None),
                }
            }),
        }
    }

    /// Runs any pending work and returns the element.
    pub async fn settle(self) -> Result<Option<T>, BoxError> {
        match self.0 {
            Inner::Ready(result) => result,
            Inner::Pending(fut) => fut.await,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.0 {
            Inner::Ready(Ok(Some(_))) => "ready",
            Inner::Ready(Ok(None)) => "suppressed",
            Inner::Ready(Err(_)) => "failed",
            Inner::Pending(_) => "pending",
        };
        f.debug_tuple("Deferred").field(&state).finish()
    }
}
