//! Completion group scenarios

use crate::prelude::*;

#[tokio::test]
async fn wait_without_add_returns_immediately() {
    let group = CompletionGroup::new();

    // A cancelled scope would fail any wait that actually blocked
    let cancelled = Scope::background();
    cancelled.cancel();

    assert_eq!(group.wait(&cancelled).await, Ok(()));
    assert!(group.signal().is_fired());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_zero_crossings_fire_once() {
    for _ in 0..50 {
        let group = CompletionGroup::new();
        group.add(8);
        let signal = group.signal();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let group = group.clone();
                tokio::spawn(async move { group.done() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(signal.is_fired());
        assert_eq!(group.count(), -8);
        group.wait(&patient()).await.unwrap();
    }
}

#[tokio::test]
async fn waiter_reports_deadline_before_completion() {
    let group = CompletionGroup::new();
    group.add(1);

    let err = group
        .wait(&Scope::background().with_timeout(Duration::from_millis(10)))
        .await
        .unwrap_err();

    assert_eq!(err, ScopeError::DeadlineExceeded);
    assert!(!group.signal().is_fired());
}
