//! Sources that feed the head of a chain.
//!
//! Restart must reproduce the original sequence, so every source keeps a way
//! to rewind: [`IterSource`] keeps a pristine clone of its iterator and
//! [`FactorySource`] calls its factory again.

use crate::stream::{Pull, PullResult, StreamNode};
use std::fmt;

/// A source over any cloneable iterator (vectors, ranges, slices of clones).
#[derive(Clone)]
pub struct IterSource<I: Iterator> {
    origin: I,
    current: I,
    exhausted: bool,
}

impl<I: Iterator + Clone> IterSource<I> {
    /// Creates a new source.
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        let origin = iter.into_iter();
        Self {
            current: origin.clone(),
            origin,
            exhausted: false,
        }
    }
}

impl<I> StreamNode for IterSource<I>
where
    I: Iterator + Clone + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        if self.exhausted {
            return Ok(Pull::Done);
        }
        match self.current.next() {
            Some(v) => Ok(Pull::Value(v)),
            None => {
                self.exhausted = true;
                Ok(Pull::Done)
            }
        }
    }

    fn restart(&mut self) {
        self.current = self.origin.clone();
        self.exhausted = false;
    }

    fn is_async(&self) -> bool {
        false
    }
}

impl<I: Iterator> fmt::Debug for IterSource<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterSource")
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

/// A source that re-seeds itself from a factory on every restart.
///
/// Useful for generators that cannot be cloned, e.g. iterators over data
/// read from elsewhere.
pub struct FactorySource<F, I> {
    factory: F,
    current: Option<I>,
    exhausted: bool,
}

impl<F, I> FactorySource<F, I>
where
    F: FnMut() -> I,
    I: Iterator,
{
    /// Creates a new source. The factory is first called on the first pull.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            current: None,
            exhausted: false,
        }
    }
}

impl<F, I> StreamNode for FactorySource<F, I>
where
    F: FnMut() -> I + Send,
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn pull(&mut self) -> PullResult<Self::Item> {
        if self.exhausted {
            return Ok(Pull::Done);
        }
        let iter = self.current.get_or_insert_with(&mut self.factory);
        match iter.next() {
            Some(v) => Ok(Pull::Value(v)),
            None => {
                self.exhausted = true;
                Ok(Pull::Done)
            }
        }
    }

    fn restart(&mut self) {
        self.current = None;
        self.exhausted = false;
    }

    fn is_async(&self) -> bool {
        false
    }
}

impl<F, I> fmt::Debug for FactorySource<F, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorySource")
            .field("started", &self.current.is_some())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn drain<S: StreamNode>(node: &mut S) -> Vec<S::Item> {
        let mut out = Vec::new();
        while let Pull::Value(v) = node.pull().unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_iter_source_restart_reproduces_sequence() {
        let mut source = IterSource::new(vec![1, 2, 3]);
        assert_eq!(drain(&mut source), vec![1, 2, 3]);

        source.restart();
        assert_eq!(drain(&mut source), vec![1, 2, 3]);
    }

    #[test]
    fn test_iter_source_stays_done() {
        let mut source = IterSource::new(0..1);
        assert_eq!(source.pull().unwrap(), Pull::Value(0));
        assert!(source.pull().unwrap().is_done());
        assert!(source.pull().unwrap().is_done());
    }

    #[test]
    fn test_factory_source_reseeds_on_restart() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let mut source = FactorySource::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            vec!["a", "b"].into_iter()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(drain(&mut source), vec!["a", "b"]);

        source.restart();
        assert_eq!(drain(&mut source), vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
