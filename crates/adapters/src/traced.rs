// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced provider wrapper for consistent observability

use async_trait::async_trait;
use std::sync::Arc;
use tether_core::{Manager, Provider, Scope};
use tracing::Instrument;

/// Wrapper that adds tracing to any Provider
#[derive(Clone)]
pub struct TracedProvider<P> {
    inner: P,
}

impl<P> TracedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Provider> Provider for TracedProvider<P> {
    type Resource = P::Resource;
    type Error = P::Error;

    async fn construct(
        &self,
        scope: &Scope,
        manager: &Manager<P::Resource, P::Error>,
    ) -> Result<P::Resource, P::Error> {
        let span = tracing::info_span!(
            "provider.construct",
            resource = manager.name(),
            trace_id = %scope.trace_id()
        );
        async {
            tracing::info!("starting");

            let start = std::time::Instant::now();
            let result = self.inner.construct(scope, manager).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(_) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "resource ready"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "construct failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn teardown(&self, scope: &Scope, resource: Arc<P::Resource>) {
        let span = tracing::info_span!("provider.teardown", trace_id = %scope.trace_id());
        async {
            let start = std::time::Instant::now();
            self.inner.teardown(scope, resource).await;
            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "released"
            );
        }
        .instrument(span)
        .await
    }

    async fn heartbeat(&self, scope: &Scope, manager: &Manager<P::Resource, P::Error>) {
        let before = manager.load();
        self.inner.heartbeat(scope, manager).await;
        let after = manager.load();

        let replaced = match (&before, &after) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        if replaced {
            tracing::info!(
                resource = manager.name(),
                had = before.is_some(),
                has = after.is_some(),
                "heartbeat changed handle"
            );
        } else {
            tracing::trace!(resource = manager.name(), "heartbeat");
        }
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
