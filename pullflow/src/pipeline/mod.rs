//! The user-facing pipeline handle.
//!
//! A [`Pipeline`] wraps the head of a pull chain. Operator methods consume the
//! handle and return a new one around a stage that owns it, so building a
//! chain never pulls anything. Terminal methods restart the
//! chain and drain it.
//!
//! ```rust,ignore
//! use pullflow::prelude::*;
//!
//! let mut evens = Pipeline::from_iterable(1..=10)
//!     .filter(|v| v % 2 == 0)
//!     .map(|v| v * 10);
//!
//! assert_eq!(evens.to_array()?, vec![20, 40, 60, 80, 100]);
//! ```

mod terminal;

#[cfg(test)]
mod integration_tests;

use crate::errors::{BoxError, ConfigurationError};
use crate::sources::{FactorySource, IterSource};
use crate::stages::{
    Direction, DistinctBy, Filter, FilterAsync, ForEach, ForEachAsync, Fork, ForkView, GroupBy,
    Map, MapAsync, MapMany, MapManyAsync, Skip, SkipWhile, SortBy, Take, TakeWhile, TryMap,
};
use crate::stream::{Deferred, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use serde::Serialize;
use std::cmp::Ordering;
use std::future::Future;
use std::hash::Hash;

/// Signature of the key function used by [`Pipeline::distinct`].
pub type CloneKey<T> = fn(&T) -> T;

/// Head of a lazily evaluated pull chain.
#[derive(Debug)]
pub struct Pipeline<S> {
    node: S,
    is_async: bool,
}

impl<S: StreamNode> Pipeline<S> {
    /// Wraps an existing node.
    pub fn new(node: S) -> Self {
        let is_async = node.is_async();
        Self { node, is_async }
    }

    /// Applies stage options to this handle.
    ///
    /// Marking a handle async routes every terminal through the async path.
    /// An async handle cannot be made sync again.
    #[must_use]
    pub fn with_options(mut self, options: StageOptions) -> Self {
        self.is_async = options.resolve(self.is_async);
        self
    }

    /// Rewinds the chain to the start of its source.
    pub fn restart(&mut self) -> &mut Self {
        self.node.restart();
        self
    }

    /// Whether any stage in the chain is asynchronous.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Consumes the handle, returning the head node.
    pub fn into_inner(self) -> S {
        self.node
    }

    /// Keeps elements matching `predicate`.
    pub fn filter<F>(self, predicate: F) -> Pipeline<Filter<Self, F>>
    where
        F: Fn(&S::Item) -> bool + Send + Sync + 'static,
    {
        Pipeline::new(Filter::new(self, predicate, StageOptions::new()))
    }

    /// Keeps elements for which the async `predicate` resolves to `true`.
    pub fn filter_async<F, Fut, E>(self, predicate: F) -> Pipeline<FilterAsync<Self, F, E>>
    where
        F: Fn(&S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Pipeline::new(FilterAsync::new(self, predicate))
    }

    /// Transforms every element.
    pub fn map<F, U>(self, transform: F) -> Pipeline<Map<Self, F>>
    where
        F: Fn(S::Item) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        Pipeline::new(Map::new(self, transform, StageOptions::new()))
    }

    /// Transforms every element with a fallible function.
    pub fn try_map<F, U, E>(self, transform: F) -> Pipeline<TryMap<Self, F, E>>
    where
        F: Fn(S::Item) -> Result<U, E> + Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Pipeline::new(TryMap::new(self, transform, StageOptions::new()))
    }

    /// Transforms every element with an async, fallible function.
    pub fn map_async<F, Fut, U, E>(self, transform: F) -> Pipeline<MapAsync<Self, F, E>>
    where
        F: Fn(S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        U: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Pipeline::new(MapAsync::new(self, transform))
    }

    /// Calls `action` on every element as it passes.
    pub fn for_each<F>(self, action: F) -> Pipeline<ForEach<Self, F>>
    where
        F: Fn(&S::Item) + Send + Sync + 'static,
    {
        Pipeline::new(ForEach::new(self, action, StageOptions::new()))
    }

    /// Awaits `action` on every element as it passes.
    pub fn for_each_async<F, Fut, E>(self, action: F) -> Pipeline<ForEachAsync<Self, F, E>>
    where
        F: Fn(&S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Pipeline::new(ForEachAsync::new(self, action))
    }

    /// Maps every element to an iterable and flattens the result.
    pub fn map_many<F, I>(self, expand: F) -> Pipeline<MapMany<Self, F, I>>
    where
        F: FnMut(S::Item) -> I + Send,
        I: IntoIterator + Send,
        I::IntoIter: Send,
        I::Item: Send + 'static,
    {
        Pipeline::new(MapMany::new(self, expand, StageOptions::new()))
    }

    /// Like [`map_many`](Self::map_many), with an async, fallible expansion.
    pub fn map_many_async<F, Fut, I, E>(self, expand: F) -> Pipeline<MapManyAsync<Self, F, I, E>>
    where
        F: FnMut(S::Item) -> Fut + Send,
        Fut: Future<Output = Result<I, E>> + Send + 'static,
        I: IntoIterator + Send,
        I::IntoIter: Send,
        I::Item: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Pipeline::new(MapManyAsync::new(self, expand))
    }

    /// Yields at most `limit` elements.
    pub fn take(self, limit: usize) -> Pipeline<Take<Self>> {
        Pipeline::new(Take::new(self, limit, StageOptions::new()))
    }

    /// Yields elements while `predicate` holds.
    pub fn take_while<F>(self, predicate: F) -> Pipeline<TakeWhile<Self, F>>
    where
        F: FnMut(&S::Item) -> bool + Send,
    {
        Pipeline::new(TakeWhile::new(self, predicate, StageOptions::new()))
    }

    /// Drops the first `count` elements.
    pub fn skip(self, count: usize) -> Pipeline<Skip<Self>> {
        Pipeline::new(Skip::new(self, count, StageOptions::new()))
    }

    /// Drops elements while `predicate` holds.
    pub fn skip_while<F>(self, predicate: F) -> Pipeline<SkipWhile<Self, F>>
    where
        F: FnMut(&S::Item) -> bool + Send,
    {
        Pipeline::new(SkipWhile::new(self, predicate, StageOptions::new()))
    }

    /// Drops elements whose key was already seen.
    pub fn distinct_by<F, K>(self, key_fn: F) -> Pipeline<DistinctBy<Self, F, K>>
    where
        F: FnMut(&S::Item) -> K + Send,
        K: Hash + Eq + Send,
    {
        Pipeline::new(DistinctBy::new(self, key_fn, StageOptions::new()))
    }

    /// Drops repeated elements.
    pub fn distinct(self) -> Pipeline<DistinctBy<Self, CloneKey<S::Item>, S::Item>>
    where
        S::Item: Clone + Hash + Eq,
    {
        self.distinct_by(<S::Item as Clone>::clone as CloneKey<S::Item>)
    }

    /// Groups elements by key, in first-seen key order.
    pub fn group_by<F, K>(self, key_fn: F) -> Pipeline<GroupBy<Self, F, K>>
    where
        F: FnMut(&S::Item) -> K + Send,
        K: Hash + Eq + Send + 'static,
    {
        Pipeline::new(GroupBy::new(self, key_fn, StageOptions::new()))
    }

    /// Sorts with a comparator. The sort is stable.
    pub fn sort_by<F>(self, compare: F) -> Pipeline<SortBy<Self>>
    where
        F: FnMut(&S::Item, &S::Item) -> Ordering + Send + 'static,
    {
        Pipeline::new(SortBy::new(self, compare, StageOptions::new()))
    }

    /// Sorts by an extracted key.
    pub fn sort_by_key<F, K>(self, key_fn: F, direction: Direction) -> Pipeline<SortBy<Self>>
    where
        F: FnMut(&S::Item) -> K + Send + 'static,
        K: Ord,
    {
        Pipeline::new(SortBy::by_key(self, key_fn, direction, StageOptions::new()))
    }

    /// Sorts by a named field of each element's serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSortKey`] for an empty field name.
    pub fn sort_by_field(
        self,
        field: &str,
        direction: Direction,
    ) -> Result<Pipeline<SortBy<Self>>, ConfigurationError>
    where
        S::Item: Serialize,
    {
        Ok(Pipeline::new(SortBy::by_field(
            self,
            field,
            direction,
            StageOptions::new(),
        )?))
    }

    /// Lends every element to `callback` as a one-element pipeline before
    /// yielding it.
    pub fn fork<F, E>(self, callback: F) -> Pipeline<Fork<Self, F, E>>
    where
        S::Item: Clone + Sync,
        F: for<'a> FnMut(Pipeline<ForkView<'a, S::Item>>) -> Result<(), E> + Send,
        E: Into<BoxError> + Send + 'static,
    {
        Pipeline::new(Fork::new(self, callback, StageOptions::new()))
    }
}

impl<I> Pipeline<IterSource<I>>
where
    I: Iterator + Clone + Send,
    I::Item: Send + 'static,
{
    /// Creates a pipeline over a cloneable iterable.
    pub fn from_iterable(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self::new(IterSource::new(iter))
    }
}

impl<F, I> Pipeline<FactorySource<F, I>>
where
    F: FnMut() -> I + Send,
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    /// Creates a pipeline that re-runs `factory` on every restart.
    pub fn from_factory(factory: F) -> Self {
        Self::new(FactorySource::new(factory))
    }
}

#[async_trait]
impl<S: StreamNode> StreamNode for Pipeline<S> {
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        self.node.pull()
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        self.node.pull_async().await
    }

    async fn pull_deferred(&mut self) -> PullResult<Deferred<Self::Item>> {
        self.node.pull_deferred().await
    }

    fn restart(&mut self) {
        self.node.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Pull;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_building_a_chain_pulls_nothing() {
        let pulled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let pulled_clone = pulled.clone();
        let _chain = Pipeline::from_iterable(1..=3)
            .for_each(move |_| {
                pulled_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .map(|v| v + 1)
            .take(2);

        assert_eq!(pulled.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_with_options_is_monotonic() {
        let chain = Pipeline::from_iterable(vec![1]).with_options(StageOptions::asynchronous());
        assert!(chain.is_async());

        let chain = chain.with_options(StageOptions::new()).map(|v| v);
        assert!(chain.is_async());
    }

    #[test]
    fn test_pipeline_is_a_stream_node() {
        let mut chain = Pipeline::from_iterable(vec!['a']);
        assert_eq!(StreamNode::pull(&mut chain).unwrap(), Pull::Value('a'));
        assert!(StreamNode::pull(&mut chain).unwrap().is_done());

        chain.restart();
        assert_eq!(StreamNode::pull(&mut chain).unwrap(), Pull::Value('a'));
    }

    #[test]
    fn test_sort_by_field_rejects_empty_name() {
        #[derive(Clone, Serialize)]
        struct Row {
            id: u32,
        }

        let err = Pipeline::from_iterable(vec![Row { id: 1 }].into_iter())
            .sort_by_field("", Direction::Asc)
            .unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidSortKey(String::new()));
    }
}
