//! End-to-end tests across chains, terminals and the pool.

use super::Pipeline;
use crate::errors::{BoxError, PipelineError};
use crate::pool::{ErrorPolicy, PoolConfig, Settled};
use crate::stream::StreamNode;
use crate::stages::{Direction, ForkView, Group};
use crate::testing::{
    assert_element_error, assert_outcome_complete, fail_on, reversed_latency, CallCounter,
    InjectedFailure, PullProbe,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_restart_idempotence() {
    let mut chain = Pipeline::from_iterable(1..=20)
        .skip(2)
        .filter(|v| v % 3 != 0)
        .map(|v| v * 2)
        .map_many(|v| vec![v, v + 1])
        .distinct_by(|v| v / 4)
        .take(6);

    let first = chain.to_array().unwrap();
    let second = chain.to_array().unwrap();
    assert_eq!(first.len(), 6);
    assert_eq!(first, second);
}

#[test]
fn test_restart_reruns_factory_source() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let mut chain = Pipeline::from_factory(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        (0..3).map(|v| v * 10)
    })
    .sort_by_key(|v| *v, Direction::Desc);

    assert_eq!(chain.to_array().unwrap(), vec![20, 10, 0]);
    assert_eq!(chain.to_array().unwrap(), vec![20, 10, 0]);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ordering_under_reversed_latency() {
    const N: u64 = 12;
    for concurrency in 1..=N as usize {
        let mut chain = Pipeline::from_iterable(0..N).map_async(|v| async move {
            tokio::time::sleep(reversed_latency(v, N)).await;
            Ok::<_, BoxError>(v)
        });

        let values = chain
            .to_array_async(PoolConfig::new().with_concurrency(concurrency))
            .await
            .unwrap();
        assert_eq!(values, (0..N).collect::<Vec<_>>(), "concurrency {concurrency}");
    }
}

#[tokio::test]
async fn test_fail_fast_short_circuit() {
    let probe = PullProbe::new(Pipeline::from_iterable(0..100u64));
    let stats = probe.stats();
    let mut chain = Pipeline::new(probe).map_async(|v| async move {
        tokio::time::sleep(reversed_latency(v % 4, 4)).await;
        fail_on(v, 5)
    });

    let err = chain
        .to_array_async(PoolConfig::new().with_error_policy(ErrorPolicy::FailFast))
        .await
        .unwrap_err();

    assert_element_error(&err, 5);
    assert!(err.to_string().contains(&InjectedFailure(5).to_string()));
    assert!(stats.pulls() < 100, "pulled {} of 100", stats.pulls());
}

#[tokio::test]
async fn test_collect_completeness() {
    let mut chain = Pipeline::from_iterable(0..100u64).map_async(|v| async move { fail_on(v, 5) });
    let config = PoolConfig::new().with_error_policy(ErrorPolicy::Collect);

    let outcome = chain.settle_async(config).await.unwrap();
    assert_outcome_complete(&outcome, 100);
    for (position, settled) in outcome.settled().iter().enumerate() {
        match settled {
            Settled::Value(v) => assert_eq!(*v, position as u64),
            Settled::Failed(f) => assert_eq!(f.position, 5),
        }
    }

    let err = chain.to_array_async(config).await.unwrap_err();
    let agg = match err {
        PipelineError::Aggregate(agg) => agg,
        other => panic!("expected an aggregate error, got {other}"),
    };
    assert_eq!(agg.positions(), vec![5]);
    assert_eq!(agg.total, 100);
}

#[test]
fn test_first_short_circuit_with_counting_matcher() {
    let counter = CallCounter::new();
    let probe = PullProbe::new(Pipeline::from_iterable(vec![1, 2, 3, 4, 5, 6]));
    let stats = probe.stats();
    let mut chain = Pipeline::new(probe);

    let found = chain.find(counter.matcher(|v: &i32, _| *v > 3)).unwrap();

    assert_eq!(found, Some(4));
    assert_eq!(counter.calls(), 4);
    assert_eq!(stats.pulls(), 4);
}

#[tokio::test]
async fn test_async_flag_monotonicity() {
    let source = Pipeline::from_iterable(0..5);
    assert!(!source.is_async());

    let mapped = source.map_async(|v: i32| async move { Ok::<_, BoxError>(v + 1) });
    assert!(mapped.is_async());
    let filtered = mapped.filter(|v| *v > 1);
    assert!(filtered.is_async());
    let mut chain = filtered.take(10).skip(0).sort_by(|a, b| b.cmp(a));
    assert!(chain.is_async());

    assert!(chain.to_array().unwrap_err().is_configuration());
    assert_eq!(chain.count(|v, _| usize::try_from(*v).unwrap()).await.unwrap(), 14);
}

#[test]
fn test_fork_non_consumption() {
    let side_total = Arc::new(AtomicUsize::new(0));
    let side_clone = side_total.clone();
    let plain = Pipeline::from_iterable(1..=5usize).map(|v| v * 3).to_array().unwrap();

    let mut forked = Pipeline::from_iterable(1..=5usize)
        .map(|v| v * 3)
        .fork(move |view: Pipeline<ForkView<'_, usize>>| -> Result<(), BoxError> {
            let mut view = view.filter(|v| v % 2 == 0);
            let even = view.first()?.unwrap_or(0);
            side_clone.fetch_add(even, Ordering::SeqCst);
            Ok(())
        });

    assert_eq!(forked.to_array().unwrap(), plain);
    assert_eq!(side_total.load(Ordering::SeqCst), 6 + 12);
}

#[tokio::test]
async fn test_fork_under_pool() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let mut chain = Pipeline::from_iterable(0..6)
        .map_async(|v: i32| async move { Ok::<_, BoxError>(v) })
        .fork(move |mut view: Pipeline<ForkView<'_, i32>>| -> Result<(), BoxError> {
            seen_clone.lock().extend(view.to_array()?);
            Ok(())
        });

    let values = chain.to_array_async(PoolConfig::new()).await.unwrap();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_group_by_after_async_map() {
    let mut chain = Pipeline::from_iterable(vec!["apple", "bean", "avocado", "beet", "corn"])
        .map_async(|s: &'static str| async move { Ok::<_, BoxError>(s.to_uppercase()) })
        .group_by(|s| s.chars().next());

    let groups: Vec<Group<Option<char>, String>> = chain.to_array_async(PoolConfig::new()).await.unwrap();
    assert_eq!(
        groups.iter().map(|g| (g.key, g.len())).collect::<Vec<_>>(),
        vec![(Some('A'), 2), (Some('B'), 2), (Some('C'), 1)]
    );
}

#[tokio::test]
async fn test_sort_by_field_with_for_each_async() {
    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Task {
        name: &'static str,
        priority: u8,
    }

    let visited = Arc::new(AtomicUsize::new(0));
    let visited_clone = visited.clone();
    let mut chain = Pipeline::from_iterable(vec![
        Task { name: "b", priority: 2 },
        Task { name: "a", priority: 9 },
        Task { name: "c", priority: 5 },
    ])
    .for_each_async(move |_task: &Task| {
        let visited = visited_clone.clone();
        async move {
            visited.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(())
        }
    })
    .sort_by_field("priority", "desc".parse().unwrap())
    .unwrap();

    let names: Vec<_> = chain
        .to_array_sequential_async()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["a", "c", "b"]);
    assert_eq!(visited.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_async_filter_then_take_under_pool() {
    let mut chain = Pipeline::from_iterable(0..50)
        .filter_async(|v: &i32| {
            let keep = v % 5 == 0;
            async move { Ok::<_, InjectedFailure>(keep) }
        })
        .take(3);

    let values = chain
        .to_array_async(PoolConfig::new().with_concurrency(8))
        .await
        .unwrap();
    assert_eq!(values, vec![0, 5, 10]);
}

/// `[1, 2, 0, 3, 4]` where the element `0` fails.
fn failing_at_zero() -> Pipeline<impl StreamNode<Item = u64>> {
    Pipeline::from_iterable(vec![1u64, 2, 0, 3, 4]).map_async(|v| async move { fail_on(v, 0) })
}

/// Settles `chain` under the collect policy, returning its values and the
/// number of failed positions.
async fn settle_collecting<S: StreamNode>(mut chain: Pipeline<S>) -> (Vec<S::Item>, usize) {
    let config = PoolConfig::new()
        .with_concurrency(3)
        .with_error_policy(ErrorPolicy::Collect);
    let outcome = chain.settle_async(config).await.unwrap();
    let failures = outcome.failures().count();
    let values = outcome
        .into_settled()
        .into_iter()
        .filter_map(|settled| match settled {
            Settled::Value(v) => Some(v),
            Settled::Failed(_) => None,
        })
        .collect();
    (values, failures)
}

#[tokio::test]
async fn test_collect_through_resolving_stages_keeps_every_element() {
    let groups = settle_collecting(failing_at_zero().group_by(|v| v % 2)).await;
    let grouped: Vec<u64> = groups.0.into_iter().flat_map(|g| g.values).collect();

    // (stage, values, failures, expected values, dropped by the stage itself)
    let cases: Vec<(&str, Vec<u64>, usize, Vec<u64>, usize)> = vec![
        {
            let (values, failures) = settle_collecting(failing_at_zero().sort_by_key(|v| *v, Direction::Desc)).await;
            ("sort_by_key", values, failures, vec![4, 3, 2, 1], 0)
        },
        ("group_by", grouped, groups.1, vec![1, 3, 2, 4], 0),
        {
            let (values, failures) = settle_collecting(failing_at_zero().skip(1)).await;
            ("skip(1)", values, failures, vec![2, 3, 4], 1)
        },
        {
            let (values, failures) = settle_collecting(failing_at_zero().skip(3)).await;
            ("skip(3)", values, failures, vec![3, 4], 2)
        },
        {
            let (values, failures) = settle_collecting(failing_at_zero().distinct_by(|v| *v)).await;
            ("distinct_by", values, failures, vec![1, 2, 3, 4], 0)
        },
        {
            let (values, failures) = settle_collecting(failing_at_zero().take(3)).await;
            ("take(3)", values, failures, vec![1, 2], 2)
        },
    ];

    for (stage, values, failures, expected, dropped) in cases {
        assert_eq!(values, expected, "{stage}");
        assert_eq!(failures, 1, "{stage}");
        assert_eq!(values.len() + failures + dropped, 5, "{stage}");
    }
}

#[test]
fn test_filter_predicate_stops_at_first_match() {
    let counter = CallCounter::new();
    let mut chain = Pipeline::from_iterable(1..=100).filter(counter.predicate(|v: &i32| v % 10 == 0));

    assert_eq!(chain.first().unwrap(), Some(10));
    assert_eq!(counter.calls(), 10);
}
