// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call deduplication
//!
//! [`CallDeduplicator::run`] lets many concurrent callers share one execution
//! of an async operation. The first caller to arrive while nothing is in
//! flight starts the operation; everyone who arrives before it settles
//! attaches to the same call and receives the same outcome.
//!
//! The operation is spawned onto its own task and runs under the operation
//! scope, so it keeps going for the callers still waiting even when the
//! caller that started it stops waiting. Each caller's wait is bounded only by
//! its own wait scope.

use crate::error::CallError;
use crate::fault::Fault;
use crate::group::CompletionGroup;
use crate::scope::Scope;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

enum Outcome<T, E> {
    Value(Arc<T>),
    Error(Arc<E>),
    Fault(Fault),
}

/// Shared state for one execution of a deduplicated operation
struct Call<T, E> {
    id: u64,
    group: CompletionGroup,
    outcome: OnceLock<Outcome<T, E>>,
}

impl<T, E> Call<T, E> {
    fn new(id: u64) -> Self {
        let group = CompletionGroup::new();
        group.add(1);
        Self {
            id,
            group,
            outcome: OnceLock::new(),
        }
    }

    async fn wait(&self, scope: &Scope) -> Result<Arc<T>, CallError<E>> {
        self.group.wait(scope).await?;
        match self.outcome.get() {
            Some(Outcome::Value(value)) => Ok(value.clone()),
            Some(Outcome::Error(error)) => Err(CallError::Failed(error.clone())),
            Some(Outcome::Fault(fault)) => Err(CallError::Panicked(fault.clone())),
            None => Err(CallError::Panicked(Fault::new(
                "call signalled completion without an outcome",
            ))),
        }
    }
}

struct Shared<T, E> {
    current: Mutex<Option<Arc<Call<T, E>>>>,
    next_id: AtomicU64,
}

/// Ensures at most one execution of an operation is in flight at a time
pub struct CallDeduplicator<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for CallDeduplicator<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Default for CallDeduplicator<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> CallDeduplicator<T, E> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                current: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// True while a call is current
    pub fn in_flight(&self) -> bool {
        self.shared
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl<T, E> CallDeduplicator<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Run `op`, or join the execution already in flight
    ///
    /// `op` receives `operation_scope` and runs until it returns, regardless
    /// of how long any caller waits. `wait_scope` bounds only this caller's
    /// wait; when it ends the caller gets [`CallError::Wait`] and the
    /// operation is unaffected.
    ///
    /// Every caller attached to the same execution receives the same `Arc`
    /// for the value, the error, or the captured panic.
    pub async fn run<F, Fut>(
        &self,
        operation_scope: &Scope,
        wait_scope: &Scope,
        op: F,
    ) -> Result<Arc<T>, CallError<E>>
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = Result<Arc<T>, E>> + Send + 'static,
    {
        let (call, owner) = {
            let mut current = self.shared.current.lock().unwrap_or_else(|e| e.into_inner());
            match current.as_ref() {
                Some(call) => (call.clone(), false),
                None => {
                    let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
                    let call = Arc::new(Call::new(id));
                    *current = Some(call.clone());
                    (call, true)
                }
            }
        };

        if owner {
            tracing::trace!(call_id = call.id, "starting deduplicated call");
            let mut settle = Settle {
                shared: self.shared.clone(),
                call: call.clone(),
                settled: false,
            };
            // `op` may panic before handing back its future
            match std::panic::catch_unwind(AssertUnwindSafe(|| op(operation_scope.clone()))) {
                Ok(fut) => Self::spawn_owner(settle, fut),
                Err(payload) => {
                    let fault = Fault::from_panic(payload);
                    tracing::warn!(call_id = call.id, fault = %fault, "deduplicated call panicked");
                    settle.finish(Outcome::Fault(fault));
                }
            }
        } else {
            tracing::trace!(call_id = call.id, "joining in-flight call");
        }

        call.wait(wait_scope).await
    }

    /// Wait until the call in flight right now, if any, has settled
    ///
    /// Calls started after this returns are not covered.
    pub async fn settled(&self) {
        let call = self
            .shared
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(call) = call {
            call.group.signal().wait().await;
        }
    }

    fn spawn_owner<Fut>(mut settle: Settle<T, E>, fut: Fut)
    where
        Fut: Future<Output = Result<Arc<T>, E>> + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(value)) => Outcome::Value(value),
                Ok(Err(error)) => Outcome::Error(Arc::new(error)),
                Err(payload) => {
                    let fault = Fault::from_panic(payload);
                    tracing::warn!(call_id = settle.call.id, fault = %fault, "deduplicated call panicked");
                    Outcome::Fault(fault)
                }
            };
            settle.finish(outcome);
        });
    }
}

/// Settles a call exactly once, even if the owning task is dropped mid-flight
struct Settle<T, E> {
    shared: Arc<Shared<T, E>>,
    call: Arc<Call<T, E>>,
    settled: bool,
}

impl<T, E> Settle<T, E> {
    fn finish(&mut self, outcome: Outcome<T, E>) {
        if self.settled {
            return;
        }
        self.settled = true;

        // OnceLock::set only fails if already set, which `settled` rules out
        drop(self.call.outcome.set(outcome));

        // Evict before signalling so a woken waiter that calls again starts fresh
        {
            let mut current = self.shared.current.lock().unwrap_or_else(|e| e.into_inner());
            if current
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &self.call))
            {
                *current = None;
            }
        }

        self.call.group.done();
        tracing::trace!(call_id = self.call.id, "deduplicated call settled");
    }
}

impl<T, E> Drop for Settle<T, E> {
    fn drop(&mut self) {
        if !self.settled {
            self.finish(Outcome::Fault(Fault::new(
                "deduplicated call abandoned before completion",
            )));
        }
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
