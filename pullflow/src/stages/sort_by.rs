//! Stable sorting.
//!
//! Like `group_by`, sorting is an eager boundary: the first pull drains the
//! upstream, later pulls walk the sorted buffer.

use crate::errors::ConfigurationError;
use crate::stream::{Pull, PullResult, StageOptions, StreamNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl Direction {
    /// Applies the direction to an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ConfigurationError::InvalidDirection(s.to_string())),
        }
    }
}

type Comparator<T> = Box<dyn FnMut(&T, &T) -> Ordering + Send>;

/// Sorts the whole upstream with a comparator. Equal elements keep pull order.
pub struct SortBy<S: StreamNode> {
    upstream: S,
    compare: Comparator<S::Item>,
    /// Elements drained so far. Survives an upstream error so draining can
    /// resume on the next pull.
    pending: Vec<S::Item>,
    sorted: Option<std::vec::IntoIter<S::Item>>,
    is_async: bool,
}

impl<S: StreamNode> SortBy<S> {
    /// Sorts with an explicit comparator.
    pub fn new<F>(upstream: S, compare: F, options: StageOptions) -> Self
    where
        F: FnMut(&S::Item, &S::Item) -> Ordering + Send + 'static,
    {
        let is_async = options.resolve(upstream.is_async());
        Self {
            upstream,
            compare: Box::new(compare),
            pending: Vec::new(),
            sorted: None,
            is_async,
        }
    }

    /// Sorts by an extracted key.
    pub fn by_key<F, K>(upstream: S, mut key_fn: F, direction: Direction, options: StageOptions) -> Self
    where
        F: FnMut(&S::Item) -> K + Send + 'static,
        K: Ord,
    {
        Self::new(
            upstream,
            move |a, b| direction.apply(key_fn(a).cmp(&key_fn(b))),
            options,
        )
    }

    /// Sorts by a named field of the element's serialized form.
    ///
    /// `field` may be a dotted path (`"address.city"`). Missing fields and
    /// elements that fail to serialize sort as `null`, i.e. first when
    /// ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSortKey`] if `field` is empty or
    /// has an empty path segment.
    pub fn by_field(
        upstream: S,
        field: &str,
        direction: Direction,
        options: StageOptions,
    ) -> Result<Self, ConfigurationError>
    where
        S::Item: Serialize,
    {
        let path: Vec<String> = field.split('.').map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return Err(ConfigurationError::InvalidSortKey(field.to_string()));
        }
        Ok(Self::new(
            upstream,
            move |a, b| direction.apply(compare_json(&field_value(a, &path), &field_value(b, &path))),
            options,
        ))
    }

    fn buffer(&mut self) {
        let mut values = std::mem::take(&mut self.pending);
        values.sort_by(|a, b| (self.compare)(a, b));
        self.sorted = Some(values.into_iter());
    }

    fn next_sorted(&mut self) -> Pull<S::Item> {
        self.sorted.as_mut().and_then(Iterator::next).into()
    }
}

#[async_trait]
impl<S: StreamNode> StreamNode for SortBy<S> {
    type Item = S::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        if self.sorted.is_none() {
            while let Pull::Value(v) = self.upstream.pull()? {
                self.pending.push(v);
            }
            self.buffer();
        }
        Ok(self.next_sorted())
    }

    async fn pull_async(&mut self) -> PullResult<Self::Item> {
        if self.sorted.is_none() {
            while let Pull::Value(v) = self.upstream.pull_async().await? {
                self.pending.push(v);
            }
            self.buffer();
        }
        Ok(self.next_sorted())
    }

    fn restart(&mut self) {
        self.pending.clear();
        self.sorted = None;
        self.upstream.restart();
    }

    fn is_async(&self) -> bool {
        self.is_async
    }
}

impl<S: StreamNode> fmt::Debug for SortBy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortBy")
            .field("buffered", &self.pending.len())
            .field("drained", &self.sorted.is_some())
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

fn field_value<T: Serialize>(item: &T, path: &[String]) -> Value {
    let Ok(mut value) = serde_json::to_value(item) else {
        return Value::Null;
    };
    for segment in path {
        value = match value {
            Value::Object(mut map) => map.remove(segment).unwrap_or(Value::Null),
            _ => return Value::Null,
        };
    }
    value
}

fn json_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .unwrap_or(f64::NAN)
                .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_json(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => json_rank(a).cmp(&json_rank(b)),
    }
}
