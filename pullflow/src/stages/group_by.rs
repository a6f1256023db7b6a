//! Grouping by key.
//!
//! `group_by` is an eager boundary: the first pull drains the whole upstream
//! into an insertion-ordered map, then yields one [`Group`] per key.

use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;

/// The elements sharing one key, in pull order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group<K, T> {
    /// The shared key.
    pub key: K,
    /// Elements with this key.
    pub values: Vec<T>,
}

impl<K, T> Group<K, T> {
    /// Number of elements in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the group has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Groups upstream elements by key, in first-seen key order.
pub struct GroupBy<S: StreamNode, F, K> {
    upstream: S,
    key_fn: F,
    /// Groups built so far. Kept across an upstream error.
    pending: IndexMap<K, Vec<S::Item>>,
    groups: Option<indexmap::map::IntoIter<K, Vec<S::Item>>>,
    is_async: bool,
}

impl<S, F, K> GroupBy<S, F, K>
where
    S: StreamNode,
    F: FnMut(&S::Item) -> K,
    K: Hash + Eq,
{
    /// Wraps `upstream`.
    pub fn new(upstream: S, key_fn: F, options: StageOptions) -> Self {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            key_fn,
            pending: IndexMap::new(),
            groups: None,
            is_async,
        }
    }

    fn insert(&mut self, value: S::Item) {
        self.pending.entry((self.key_fn)(&value)).or_default().push(value);
    }

    fn seal(&mut self) {
        self.groups = Some(std::mem::take(&mut self.pending).into_iter());
    }

    fn next_group(&mut self) -> Pull<Group<K, S::Item>> {
        self.groups
            .as_mut()
            .and_then(Iterator::next)
            .map(|(key, values)| Group { key, values })
            .into()
    }
}

#[async_trait]
impl<S, F, K> StreamNode for GroupBy<S, F, K>
where
    S: StreamNode,
    F: FnMut(&S::Item) -> K + Send,
    K: Hash + Eq + Send + 'static,
{
    type Item = Group<K, S::Item>;

    fn pull(&mut self) -> PullResult<Self::Item> {
        if self.groups.is_none() {
            while let Pull::Value(v) = self.upstream.pull()? {
                self.insert(v);
            }
            self.seal();
        }
        Ok(self.next_group())
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        if self.groups.is_none() {
            while let Pull::Value(v) = self.upstream.pull_async().await? {
                self.insert(v);
            }
            self.seal();
        }
        Ok(self.next_group())
    }

    fn restart(&mut self) {
        self.pending.clear();
        self.groups = None;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S: StreamNode, F, K> fmt::Debug for GroupBy<S, F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBy")
            .field("keys", &self.pending.len())
            .field("drained", &self.groups.is_some())
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}
