//! Operator stages.
//!
//! Every stage wraps exactly one upstream [`StreamNode`](crate::stream::StreamNode)
//! and is constructed through the matching [`Pipeline`](crate::pipeline::Pipeline)
//! method. Element-wise stages (filter, map, for-each and their async forms)
//! compose onto deferred work so the worker pool can run it concurrently;
//! the remaining stages need settled values to decide what to yield.

mod distinct;
mod filter;
mod for_each;
mod fork;
mod group_by;
mod map;
mod map_many;
mod skip;
mod sort_by;
mod take;

pub use distinct::DistinctBy;
pub use filter::{Filter, FilterAsync};
pub use for_each::{ForEach, ForEachAsync};
pub use fork::{Fork, ForkView};
pub use group_by::{Group, GroupBy};
pub use map::{Map, MapAsync, TryMap};
pub use map_many::{MapMany, MapManyAsync};
pub use skip::{Skip, SkipWhile};
pub use sort_by::{Direction, SortBy};
pub use take::{Take, TakeWhile};
