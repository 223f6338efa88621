// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazily constructed, health-checked resource handles
//!
//! A [`ResourceLifecycle`] owns one cached handle for a subsystem:
//! - **Construct** builds it on demand, sharing one build among concurrent callers
//! - **Load** reads the cached handle without ever building
//! - **Heartbeat** periodically lets the [`Provider`] inspect, replace, or evict it,
//!   and tears it down once when its scope ends
//!
//! ```text
//! Empty ──construct──► Live ──stop / store(None)──► Empty
//!   ▲                    │
//!   └── failure ◄────────┘ (construct error leaves it Empty)
//! ```

mod manager;
mod provider;
#[cfg(test)]
pub(crate) mod testing;

pub use manager::Manager;
pub use provider::Provider;

use crate::config::LifecycleConfig;
use crate::dedup::CallDeduplicator;
use crate::error::CallError;
use crate::group::CompletionGroup;
use crate::scope::Scope;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, Instrument};

pub(crate) struct Shared<R, E> {
    name: String,
    interval: Duration,
    provider: Arc<dyn Provider<Resource = R, Error = E>>,
    slot: RwLock<Option<Arc<R>>>,
    calls: CallDeduplicator<R, E>,
    operating: Scope,
}

impl<R, E> Shared<R, E>
where
    R: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    async fn teardown(self: &Arc<Self>, scope: &Scope, resource: Arc<R>) {
        let detached = scope.detached();
        let span = detached.span();
        let shared = self.clone();
        let task = tokio::spawn(
            async move {
                let start = Instant::now();
                shared.provider.teardown(&detached, resource).await;
                info!(
                    resource = %shared.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "torn down"
                );
            }
            .instrument(span),
        );
        if let Err(e) = task.await {
            error!(resource = %self.name, error = %e, "teardown did not complete");
        }
    }
}

/// Owner of one lazily constructed, atomically replaceable resource handle
pub struct ResourceLifecycle<P: Provider> {
    shared: Arc<Shared<P::Resource, P::Error>>,
    provider: Arc<P>,
}

impl<P: Provider> Clone for ResourceLifecycle<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            provider: self.provider.clone(),
        }
    }
}

impl<P: Provider> ResourceLifecycle<P> {
    /// New empty lifecycle whose constructors run under a background scope
    pub fn new(provider: P, config: LifecycleConfig) -> Self {
        Self::with_operating_scope(provider, config, Scope::background())
    }

    /// New empty lifecycle whose constructors run under `operating`
    ///
    /// Cancelling `operating` is visible to any constructor in flight and to
    /// every later one.
    pub fn with_operating_scope(provider: P, config: LifecycleConfig, operating: Scope) -> Self {
        let provider = Arc::new(provider);
        Self {
            shared: Arc::new(Shared {
                name: config.name,
                interval: config.heartbeat_interval,
                provider: provider.clone(),
                slot: RwLock::new(None),
                calls: CallDeduplicator::new(),
                operating,
            }),
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Currently cached handle; never blocks and never constructs
    pub fn load(&self) -> Option<Arc<P::Resource>> {
        self.manager().load()
    }

    /// Cached handle, or one built by a construction shared with concurrent callers
    ///
    /// `scope` bounds only how long this caller waits for the result.
    pub async fn construct(&self, scope: &Scope) -> Result<Arc<P::Resource>, CallError<P::Error>> {
        self.manager().construct(scope).await
    }

    /// Run the periodic health check until `scope` ends
    ///
    /// Every interval the provider's `heartbeat` runs with a [`Manager`]. When
    /// `scope` ends any construction in flight is allowed to settle, the cached
    /// handle is evicted and torn down once, then
    /// `group` is marked done so a supervisor can wait for the teardown.
    pub async fn heartbeat(&self, scope: Scope, group: CompletionGroup) {
        let manager = self.manager();
        // tokio intervals reject a zero period
        let period = self.shared.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            resource = %self.shared.name,
            interval_ms = period.as_millis() as u64,
            "heartbeat started"
        );

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                biased;
                reason = scope.done() => {
                    info!(resource = %self.shared.name, ticks, reason = %reason, "heartbeat stopping");
                    break;
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    self.provider.heartbeat(&scope, &manager).await;
                }
            }
        }

        // A construction still in flight would store a handle after our stop
        let mut torn_down = false;
        loop {
            self.shared.calls.settled().await;
            torn_down |= manager.stop(&scope).await;
            if !self.shared.calls.in_flight() {
                break;
            }
        }
        info!(resource = %self.shared.name, torn_down, "heartbeat stopped");
        group.done();
    }

    pub(crate) fn manager(&self) -> Manager<P::Resource, P::Error> {
        Manager {
            shared: self.shared.clone(),
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
