//! Terminal operations.
//!
//! Every terminal restarts the chain first, so calling one twice on a
//! reproducible source gives the same answer twice. Callbacks receive the
//! element and its zero-based pull index. Failures name the position at
//! which they happened.

use super::Pipeline;
use crate::errors::{BoxError, ConfigurationError, PipelineError};
use crate::pool::{AsyncPool, PoolConfig, PoolOutcome};
use crate::stream::{Pull, StreamNode};
use indexmap::IndexMap;
use std::future::Future;
use std::hash::Hash;
use tracing::debug;

impl<S: StreamNode> Pipeline<S> {
    fn ensure_sync(&self) -> Result<(), PipelineError> {
        if self.is_async() {
            return Err(ConfigurationError::AsyncStage("pipeline").into());
        }
        Ok(())
    }

    fn next_at(&mut self, position: usize) -> Result<Option<S::Item>, PipelineError> {
        StreamNode::pull(self)
            .map(Pull::into_option)
            .map_err(|e| PipelineError::element(position, e))
    }

    async fn next_async_at(&mut self, position: usize) -> Result<Option<S::Item>, PipelineError> {
        StreamNode::pull_async(self)
            .await
            .map(Pull::into_option)
            .map_err(|e| PipelineError::element(position, e))
    }

    /// Drains the chain into a vector.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::AsyncStage`] on an async chain and
    /// with [`PipelineError::Element`] on the first failing element.
    pub fn to_array(&mut self) -> Result<Vec<S::Item>, PipelineError> {
        self.ensure_sync()?;
        self.restart();
        let mut out = Vec::new();
        while let Some(value) = self.next_at(out.len())? {
            out.push(value);
        }
        Ok(out)
    }

    /// Drains the chain into an insertion-ordered map keyed by `key_fn`.
    ///
    /// Duplicate keys overwrite: the last value wins, the first insertion
    /// position is kept.
    pub fn to_dictionary<K, F>(&mut self, mut key_fn: F) -> Result<IndexMap<K, S::Item>, PipelineError>
    where
        K: Hash + Eq,
        F: FnMut(&S::Item) -> K,
    {
        self.ensure_sync()?;
        self.restart();
        let mut map = IndexMap::new();
        let mut position = 0;
        while let Some(value) = self.next_at(position)? {
            map.insert(key_fn(&value), value);
            position += 1;
        }
        Ok(map)
    }

    /// Like [`to_dictionary`](Self::to_dictionary), with a value projection.
    pub fn to_dictionary_with<K, V, FK, FV>(
        &mut self,
        mut key_fn: FK,
        mut value_fn: FV,
    ) -> Result<IndexMap<K, V>, PipelineError>
    where
        K: Hash + Eq,
        FK: FnMut(&S::Item) -> K,
        FV: FnMut(S::Item) -> V,
    {
        self.ensure_sync()?;
        self.restart();
        let mut map = IndexMap::new();
        let mut position = 0;
        while let Some(value) = self.next_at(position)? {
            map.insert(key_fn(&value), value_fn(value));
            position += 1;
        }
        Ok(map)
    }

    /// Returns the first element, pulling exactly once.
    ///
    /// The matcher form, the first element accepted by a predicate, is
    /// [`find`](Self::find).
    pub fn first(&mut self) -> Result<Option<S::Item>, PipelineError> {
        self.find(|_, _| true)
    }

    /// Returns the first element accepted by `matcher`.
    ///
    /// Stops pulling as soon as an element matches.
    pub fn find<F>(&mut self, mut matcher: F) -> Result<Option<S::Item>, PipelineError>
    where
        F: FnMut(&S::Item, usize) -> bool,
    {
        self.ensure_sync()?;
        self.restart();
        let mut position = 0;
        while let Some(value) = self.next_at(position)? {
            if matcher(&value, position) {
                return Ok(Some(value));
            }
            position += 1;
        }
        Ok(None)
    }

    /// Sums `f(element, index)` over the chain.
    ///
    /// A synchronous chain is counted without ever suspending, so the
    /// returned future is ready on first poll. An async chain is counted
    /// through the async pull path.
    pub async fn count<F>(&mut self, mut f: F) -> Result<usize, PipelineError>
    where
        F: FnMut(&S::Item, usize) -> usize,
    {
        self.restart();
        let mut total = 0;
        let mut position = 0;
        if self.is_async() {
            debug!("Counting through the async pull path");
            while let Some(value) = self.next_async_at(position).await? {
                total += f(&value, position);
                position += 1;
            }
        } else {
            while let Some(value) = self.next_at(position)? {
                total += f(&value, position);
                position += 1;
            }
        }
        Ok(total)
    }

    /// Drains the chain one element at a time, awaiting each pull.
    pub async fn to_array_sequential_async(&mut self) -> Result<Vec<S::Item>, PipelineError> {
        self.restart();
        let mut out = Vec::new();
        while let Some(value) = self.next_async_at(out.len()).await? {
            out.push(value);
        }
        Ok(out)
    }

    /// Builds an insertion-ordered map from an async entry function.
    pub async fn to_dictionary_async<K, V, F, Fut, E>(
        &mut self,
        mut entry_fn: F,
    ) -> Result<IndexMap<K, V>, PipelineError>
    where
        K: Hash + Eq,
        F: FnMut(S::Item) -> Fut,
        Fut: Future<Output = Result<(K, V), E>>,
        E: Into<BoxError>,
    {
        self.restart();
        let mut map = IndexMap::new();
        let mut position = 0;
        while let Some(value) = self.next_async_at(position).await? {
            let (key, value) = entry_fn(value)
                .await
                .map_err(|e| PipelineError::element(position, e.into()))?;
            map.insert(key, value);
            position += 1;
        }
        Ok(map)
    }

    /// Returns the first element accepted by an async `matcher`.
    pub async fn find_async<F, Fut, E>(&mut self, mut matcher: F) -> Result<Option<S::Item>, PipelineError>
    where
        F: FnMut(&S::Item, usize) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Into<BoxError>,
    {
        self.restart();
        let mut position = 0;
        while let Some(value) = self.next_async_at(position).await? {
            let matched = matcher(&value, position)
                .await
                .map_err(|e| PipelineError::element(position, e.into()))?;
            if matched {
                return Ok(Some(value));
            }
            position += 1;
        }
        Ok(None)
    }

    /// Sums an async, fallible `f(element, index)` over the chain.
    pub async fn count_async<F, Fut, E>(&mut self, mut f: F) -> Result<usize, PipelineError>
    where
        F: FnMut(&S::Item, usize) -> Fut,
        Fut: Future<Output = Result<usize, E>>,
        E: Into<BoxError>,
    {
        self.restart();
        let mut total = 0;
        let mut position = 0;
        while let Some(value) = self.next_async_at(position).await? {
            total += f(&value, position)
                .await
                .map_err(|e| PipelineError::element(position, e.into()))?;
            position += 1;
        }
        Ok(total)
    }

    /// Drains the chain with a worker pool and returns the per-position
    /// report.
    ///
    /// See [`AsyncPool::run`] for the error policies.
    pub async fn settle_async(&mut self, config: PoolConfig) -> Result<PoolOutcome<S::Item>, PipelineError> {
        AsyncPool::new(config)?.run(self).await
    }

    /// Drains the chain with a worker pool into a vector in pull order.
    ///
    /// # Errors
    ///
    /// Under fail-fast, the first failing element as
    /// [`PipelineError::Element`]. Under collect, every failure as
    /// [`PipelineError::Aggregate`].
    pub async fn to_array_async(&mut self, config: PoolConfig) -> Result<Vec<S::Item>, PipelineError> {
        Ok(self.settle_async(config).await?.into_values()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CallCounter;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_array() {
        let mut chain = Pipeline::from_iterable(1..=5).filter(|v| v % 2 == 1);
        assert_eq!(chain.to_array().unwrap(), vec![1, 3, 5]);
    }

    #[test]
    fn test_to_array_reports_failing_position() {
        let mut chain = Pipeline::from_iterable(vec![4, 2, 0, 1]).try_map(|v: i32| {
            if v == 0 {
                Err(format!("cannot divide by {v}"))
            } else {
                Ok(8 / v)
            }
        });

        let err = chain.to_array().unwrap_err();
        assert_eq!(err.position(), Some(2));
        assert!(err.to_string().contains("cannot divide by 0"));
    }

    #[test]
    fn test_to_array_keeps_anyhow_context() {
        use anyhow::Context;

        let mut chain = Pipeline::from_iterable(vec!["1", "x", "3"]).try_map(|s: &str| {
            s.parse::<u32>()
                .with_context(|| format!("parsing {s:?}"))
        });

        let err = chain.to_array().unwrap_err();
        assert_eq!(err.position(), Some(1));
        assert!(err.to_string().contains("parsing \"x\""));
    }

    #[test]
    fn test_sync_terminal_refuses_async_chain() {
        let mut chain = Pipeline::from_iterable(vec![1]).map_async(|v: i32| async move { Ok::<_, BoxError>(v) });
        let err = chain.to_array().unwrap_err();
        assert!(err.is_configuration());
        assert!(chain.first().unwrap_err().is_configuration());
    }

    #[test]
    fn test_to_dictionary_last_write_wins() {
        let mut chain = Pipeline::from_iterable(vec![("a", 1), ("b", 2), ("a", 3)]);
        let dict = chain.to_dictionary(|pair| pair.0).unwrap();

        assert_eq!(dict.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(dict["a"], ("a", 3));
    }

    #[test]
    fn test_to_dictionary_with_projection() {
        let mut chain = Pipeline::from_iterable(vec!["apple", "avocado", "banana"]);
        let dict = chain.to_dictionary_with(|s| s.chars().next(), str::len).unwrap();

        assert_eq!(dict.get(&Some('a')), Some(&7));
        assert_eq!(dict.get(&Some('b')), Some(&6));
    }

    #[test]
    fn test_first_on_empty_chain() {
        let mut chain = Pipeline::from_iterable(Vec::<u8>::new());
        assert_eq!(chain.first().unwrap(), None);
    }

    #[test]
    fn test_first_is_find_without_matcher() {
        let mut chain = Pipeline::from_iterable(vec![7, 8, 9]);
        assert_eq!(chain.first().unwrap(), chain.find(|_, _| true).unwrap());
        assert_eq!(chain.find(|v, _| *v > 7).unwrap(), Some(8));
    }

    #[test]
    fn test_find_passes_index() {
        let mut chain = Pipeline::from_iterable(vec![10, 20, 30]);
        assert_eq!(chain.find(|_, i| i == 2).unwrap(), Some(30));
        assert_eq!(chain.find(|v, _| *v > 100).unwrap(), None);
    }

    #[test]
    fn test_find_short_circuits() {
        let counter = CallCounter::new();
        let mut chain = Pipeline::from_iterable(1..=6);

        let found = chain.find(counter.matcher(|v: &i32, _| *v > 3)).unwrap();
        assert_eq!(found, Some(4));
        assert_eq!(counter.calls(), 4);
    }

    #[test]
    fn test_count_on_sync_chain_never_suspends() {
        let mut chain = Pipeline::from_iterable(vec![1, 2, 3]);
        let total = chain.count(|v, i| *v * 10 + i).now_or_never().unwrap().unwrap();
        assert_eq!(total, 63);
    }

    #[tokio::test]
    async fn test_sequential_async_terminals() {
        let mut chain = Pipeline::from_iterable(1..=4u32).map_async(|v| async move { Ok::<_, BoxError>(v * v) });

        assert_eq!(chain.to_array_sequential_async().await.unwrap(), vec![1, 4, 9, 16]);
        assert_eq!(chain.count(|_, _| 1).await.unwrap(), 4);

        let found = chain
            .find_async(|v, _| {
                let v = *v;
                async move { Ok::<_, BoxError>(v > 5) }
            })
            .await
            .unwrap();
        assert_eq!(found, Some(9));

        let total = chain
            .count_async(|v, _| {
                let v = *v as usize;
                async move { Ok::<_, BoxError>(v) }
            })
            .await
            .unwrap();
        assert_eq!(total, 30);
    }

    #[tokio::test]
    async fn test_to_dictionary_async() {
        let mut chain = Pipeline::from_iterable(vec!["x", "yy", "x"]);
        let dict = chain
            .to_dictionary_async(|s| async move { Ok::<_, BoxError>((s, s.len())) })
            .await
            .unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict["yy"], 2);
    }

    #[tokio::test]
    async fn test_async_terminal_callback_error_names_position() {
        let mut chain = Pipeline::from_iterable(vec![1, 2, 3]);
        let err = chain
            .count_async(|v, _| {
                let v = *v;
                async move {
                    if v == 3 {
                        Err::<usize, BoxError>("three".into())
                    } else {
                        Ok(1)
                    }
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err.position(), Some(2));
    }

    #[tokio::test]
    async fn test_to_array_async_rejects_zero_concurrency() {
        let mut chain = Pipeline::from_iterable(vec![1]);
        let err = chain
            .to_array_async(PoolConfig::new().with_concurrency(0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::InvalidConcurrency(0))
        ));
    }
}
