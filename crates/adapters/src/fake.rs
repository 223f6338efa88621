// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake provider for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_core::{Manager, Provider, Scope};

/// Handle built by [`FakeProvider`]; `id` is the construct attempt that built it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResource {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fake construct failed: {0}")]
pub struct FakeError(pub String);

/// Recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Construct { attempt: u64 },
    Teardown { id: u64, cancelled: bool },
    Heartbeat { tick: u64, loaded: Option<u64> },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<ProviderCall>,
    failures: VecDeque<String>,
    attempts: u64,
    ticks: u64,
}

/// Fake provider for testing
///
/// Clones share recorded state, so a test can keep one while a lifecycle
/// owns another.
#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
    delay: Duration,
    stop_on_tick: Option<u64>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every construct take `delay` before settling
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Have the heartbeat stop the resource on tick `tick` (1-based)
    pub fn with_stop_on_tick(mut self, tick: u64) -> Self {
        self.stop_on_tick = Some(tick);
        self
    }

    /// Fail the next construct attempt with `message`
    pub fn fail_next(&self, message: &str) {
        self.lock().failures.push_back(message.to_string());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    pub fn construct_count(&self) -> u64 {
        self.lock().attempts
    }

    pub fn ticks(&self) -> u64 {
        self.lock().ticks
    }

    /// Ids of every torn down resource, in teardown order
    pub fn teardown_ids(&self) -> Vec<u64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ProviderCall::Teardown { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Provider for FakeProvider {
    type Resource = FakeResource;
    type Error = FakeError;

    async fn construct(
        &self,
        _scope: &Scope,
        _manager: &Manager<FakeResource, FakeError>,
    ) -> Result<FakeResource, FakeError> {
        let (attempt, failure) = {
            let mut state = self.lock();
            state.attempts += 1;
            let attempt = state.attempts;
            state.calls.push(ProviderCall::Construct { attempt });
            (attempt, state.failures.pop_front())
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match failure {
            Some(message) => Err(FakeError(message)),
            None => Ok(FakeResource { id: attempt }),
        }
    }

    async fn teardown(&self, scope: &Scope, resource: Arc<FakeResource>) {
        self.lock().calls.push(ProviderCall::Teardown {
            id: resource.id,
            cancelled: scope.is_cancelled(),
        });
    }

    async fn heartbeat(&self, scope: &Scope, manager: &Manager<FakeResource, FakeError>) {
        let tick = {
            let mut state = self.lock();
            state.ticks += 1;
            let tick = state.ticks;
            state.calls.push(ProviderCall::Heartbeat {
                tick,
                loaded: manager.load().map(|r| r.id),
            });
            tick
        };

        if self.stop_on_tick == Some(tick) {
            manager.stop(scope).await;
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
