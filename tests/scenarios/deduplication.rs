//! Call deduplication scenarios

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

type Dedup = CallDeduplicator<String, FakeError>;

fn slow_op(
    calls: Arc<AtomicUsize>,
    release: Arc<Notify>,
) -> impl FnOnce(Scope) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Arc<String>, FakeError>> + Send>>
{
    move |_scope| {
        Box::pin(async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            release.notified().await;
            Ok(Arc::new(format!("result-{}", n)))
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn n_callers_share_one_execution() {
    let dedup = Dedup::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());
    let operating = Scope::background();

    let callers: Vec<_> = (0..32)
        .map(|_| {
            let dedup = dedup.clone();
            let op = slow_op(calls.clone(), release.clone());
            let operating = operating.clone();
            tokio::spawn(async move { dedup.run(&operating, &patient(), op).await })
        })
        .collect();

    until(|| calls.load(Ordering::SeqCst) == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    release.notify_one();

    let mut results = Vec::new();
    for caller in callers {
        results.push(caller.await.unwrap().unwrap());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_waiter_leaves_others_unaffected() {
    let dedup = Dedup::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());
    let operating = Scope::background();

    let quitter_scope = Scope::background();
    let quitter = {
        let dedup = dedup.clone();
        let op = slow_op(calls.clone(), release.clone());
        let (operating, scope) = (operating.clone(), quitter_scope.clone());
        tokio::spawn(async move { dedup.run(&operating, &scope, op).await })
    };
    until(|| calls.load(Ordering::SeqCst) == 1).await;

    let stayer = {
        let dedup = dedup.clone();
        let op = slow_op(calls.clone(), release.clone());
        let operating = operating.clone();
        tokio::spawn(async move { dedup.run(&operating, &patient(), op).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    quitter_scope.cancel();
    let gave_up = quitter.await.unwrap().unwrap_err();
    assert!(matches!(gave_up, CallError::Wait(ScopeError::Cancelled)));
    assert!(dedup.in_flight());

    release.notify_one();
    assert_eq!(*stayer.await.unwrap().unwrap(), "result-1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn each_settled_call_is_followed_by_a_fresh_one() {
    let dedup = Dedup::new();
    let operating = Scope::background();

    let err = dedup
        .run(&operating, &patient(), |_| async {
            Err::<Arc<String>, _>(FakeError("first".to_string()))
        })
        .await
        .unwrap_err();
    assert_eq!(**err.failure().unwrap(), FakeError("first".to_string()));

    let fault = dedup
        .run(&operating, &patient(), |_| async {
            if true {
                panic!("second");
            }
            Ok::<Arc<String>, FakeError>(Arc::new(String::new()))
        })
        .await
        .unwrap_err();
    assert_eq!(fault.fault().unwrap().message(), "second");

    let value = dedup
        .run(&operating, &patient(), |_| async {
            Ok::<_, FakeError>(Arc::new("third".to_string()))
        })
        .await
        .unwrap();
    assert_eq!(*value, "third");
}

#[derive(Debug, Clone, PartialEq)]
struct PoolExhausted {
    size: usize,
}

#[tokio::test]
async fn waiters_reraise_the_same_panic_payload() {
    let dedup = Dedup::new();
    let release = Arc::new(Notify::new());
    let operating = Scope::background();

    let spawn_caller = |release: Option<Arc<Notify>>| {
        let dedup = dedup.clone();
        let operating = operating.clone();
        tokio::spawn(async move {
            dedup
                .run(&operating, &patient(), move |_| async move {
                    if let Some(release) = release {
                        release.notified().await;
                    }
                    if true {
                        std::panic::panic_any(PoolExhausted { size: 4 });
                    }
                    Ok::<Arc<String>, FakeError>(Arc::new(String::new()))
                })
                .await
        })
    };
    let owner = spawn_caller(Some(release.clone()));
    until(|| dedup.in_flight()).await;
    let joiner = spawn_caller(None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    release.notify_one();

    let a = owner.await.unwrap().unwrap_err().fault().unwrap().clone();
    let b = joiner.await.unwrap().unwrap_err().fault().unwrap().clone();
    assert!(a.ptr_eq(&b));
    assert_eq!(b.downcast::<PoolExhausted>(), Some(PoolExhausted { size: 4 }));

    // Re-raising in the waiter's own stack carries the shared fault
    let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| b.resume())).unwrap_err();
    let reraised = payload.downcast::<Fault>().unwrap();
    assert!(reraised.ptr_eq(&a));
    assert!(reraised.is::<PoolExhausted>());
}
