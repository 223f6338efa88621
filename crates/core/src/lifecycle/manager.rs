// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability handed to provider callbacks

use super::Shared;
use crate::error::CallError;
use crate::scope::Scope;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read, replace, evict, or rebuild a lifecycle's cached handle
///
/// `R` is the resource type and `E` the constructor's error type.
pub struct Manager<R, E> {
    pub(super) shared: Arc<Shared<R, E>>,
}

impl<R, E> Clone for Manager<R, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R, E> Manager<R, E>
where
    R: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Currently cached handle; never blocks on construction
    pub fn load(&self) -> Option<Arc<R>> {
        self.shared
            .slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the cached handle, returning the one displaced
    ///
    /// Bypasses construction. `store(None)` evicts without teardown; the
    /// displaced handle is the caller's to release.
    pub fn store(&self, resource: Option<Arc<R>>) -> Option<Arc<R>> {
        let mut slot = self.shared.slot.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, resource)
    }

    /// Evict the cached handle and tear it down
    ///
    /// Returns true if a handle was present. Teardown runs under a scope
    /// detached from `scope`, on its own task, so it completes even if `scope`
    /// is already cancelled or this future is dropped.
    pub async fn stop(&self, scope: &Scope) -> bool {
        let Some(resource) = self.store(None) else {
            return false;
        };
        debug!(resource = %self.shared.name, "evicted");
        self.shared.teardown(scope, resource).await;
        true
    }

    /// Cached handle, or build one shared by all concurrent callers
    ///
    /// `scope` bounds only how long this caller waits. Construction runs
    /// under the lifecycle's operating scope. Failures are never cached.
    pub async fn construct(&self, scope: &Scope) -> Result<Arc<R>, CallError<E>> {
        if let Some(resource) = self.load() {
            return Ok(resource);
        }

        let manager = self.clone();
        self.shared
            .calls
            .run(&self.shared.operating, scope, move |op_scope| async move {
                // A call that settled after our load above may already have stored
                if let Some(resource) = manager.load() {
                    return Ok(resource);
                }

                let name = manager.shared.name.clone();
                info!(resource = %name, "constructing");
                let start = Instant::now();
                let result = manager.shared.provider.construct(&op_scope, &manager).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;

                match result {
                    Ok(resource) => {
                        let resource = Arc::new(resource);
                        if manager.store(Some(resource.clone())).is_some() {
                            warn!(resource = %name, "replaced a handle stored during construction");
                        }
                        info!(resource = %name, elapsed_ms, "constructed");
                        Ok(resource)
                    }
                    Err(e) => {
                        warn!(resource = %name, elapsed_ms, error = %e, "construction failed");
                        Err(e)
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
