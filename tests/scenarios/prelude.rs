//! Shared helpers for scenario tests

pub use std::sync::Arc;
pub use std::time::Duration;
pub use tether_adapters::{FakeError, FakeProvider, FakeResource, ProviderCall};
pub use tether_core::{
    CallDeduplicator, CallError, CompletionGroup, Fault, LifecycleConfig, ResourceLifecycle,
    Scope, ScopeError, Supervisor,
};
pub use tokio::task::JoinHandle;

/// Scope generous enough that only a hung test trips it
pub fn patient() -> Scope {
    Scope::background().with_timeout(Duration::from_secs(5))
}

/// Lifecycle over `fake` with the given heartbeat interval
pub fn fake_lifecycle(fake: &FakeProvider, interval: Duration) -> ResourceLifecycle<FakeProvider> {
    ResourceLifecycle::new(
        fake.clone(),
        LifecycleConfig::new("fake").with_heartbeat_interval(interval),
    )
}

/// Running heartbeat plus the handles needed to stop it
pub struct Heartbeat {
    pub scope: Scope,
    pub group: CompletionGroup,
    pub task: JoinHandle<()>,
}

impl Heartbeat {
    pub fn start<P: tether_core::Provider>(lifecycle: &ResourceLifecycle<P>) -> Self {
        let scope = Scope::background();
        let group = CompletionGroup::new();
        group.add(1);
        let task = {
            let lifecycle = lifecycle.clone();
            let (scope, group) = (scope.clone(), group.clone());
            tokio::spawn(async move { lifecycle.heartbeat(scope, group).await })
        };
        Self { scope, group, task }
    }

    /// Cancel the heartbeat and wait for its teardown to finish
    pub async fn shutdown(self) {
        self.scope.cancel();
        self.group.wait(&patient()).await.unwrap();
        self.task.await.unwrap();
    }
}

/// Poll `check` every few milliseconds until it holds
pub async fn until(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
