//! Resource lifecycle scenarios

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn m_concurrent_constructs_build_one_handle() {
    let fake = FakeProvider::new().with_delay(Duration::from_millis(30));
    let lifecycle = fake_lifecycle(&fake, Duration::from_secs(10));

    let callers: Vec<_> = (0..24)
        .map(|_| {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.construct(&patient()).await })
        })
        .collect();
    let mut handles = Vec::new();
    for caller in callers {
        handles.push(caller.await.unwrap().unwrap());
    }

    assert_eq!(fake.construct_count(), 1);
    let cached = lifecycle.load().unwrap();
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &cached)));
    assert!(Arc::ptr_eq(&lifecycle.load().unwrap(), &cached));
}

#[tokio::test]
async fn heartbeat_stop_on_third_tick_empties_until_next_construct() {
    let fake = FakeProvider::new().with_stop_on_tick(3);
    let lifecycle = fake_lifecycle(&fake, Duration::from_millis(10));
    lifecycle.construct(&patient()).await.unwrap();

    let heartbeat = Heartbeat::start(&lifecycle);
    until(|| fake.teardown_ids() == vec![1]).await;

    // Between the stop and the next construct nothing is cached
    assert!(lifecycle.load().is_none());
    until(|| fake.ticks() >= 4).await;
    assert!(lifecycle.load().is_none());
    assert!(fake
        .calls()
        .contains(&ProviderCall::Heartbeat { tick: 4, loaded: None }));
    assert_eq!(fake.construct_count(), 1);

    let rebuilt = lifecycle.construct(&patient()).await.unwrap();
    assert_eq!(*rebuilt, FakeResource { id: 2 });
    assert_eq!(fake.construct_count(), 2);
    assert!(Arc::ptr_eq(&lifecycle.load().unwrap(), &rebuilt));

    heartbeat.shutdown().await;
    assert_eq!(fake.teardown_ids(), vec![1, 2]);
}

#[tokio::test]
async fn shared_error_then_fresh_construct() {
    let fake = FakeProvider::new().with_delay(Duration::from_millis(50));
    fake.fail_next("connection reset");
    let lifecycle = fake_lifecycle(&fake, Duration::from_secs(10));

    let caller_a = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.construct(&patient()).await })
    };
    until(|| fake.construct_count() == 1).await;
    let caller_b = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.construct(&patient()).await })
    };

    let a = caller_a.await.unwrap().unwrap_err();
    let b = caller_b.await.unwrap().unwrap_err();
    let (a, b) = (a.failure().unwrap(), b.failure().unwrap());
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(**a, FakeError("connection reset".to_string()));
    assert_eq!(fake.construct_count(), 1);
    assert!(lifecycle.load().is_none());

    // Caller C starts over and succeeds
    let c = lifecycle.construct(&patient()).await.unwrap();
    assert_eq!(c.id, 2);
    assert_eq!(fake.construct_count(), 2);
}

#[tokio::test]
async fn impatient_caller_does_not_abort_shared_construct() {
    let fake = FakeProvider::new().with_delay(Duration::from_millis(40));
    let lifecycle = fake_lifecycle(&fake, Duration::from_secs(10));

    let impatient = Scope::background().with_timeout(Duration::from_millis(5));
    let err = lifecycle.construct(&impatient).await.unwrap_err();
    assert!(err.is_wait());

    let joined = lifecycle.construct(&patient()).await.unwrap();
    assert_eq!(joined.id, 1);
    assert_eq!(fake.construct_count(), 1);
}
