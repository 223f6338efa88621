// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion counting
//!
//! A [`CompletionGroup`] counts outstanding units of work and fires a one-shot
//! [`Signal`] when the count reaches zero. Once fired the signal stays fired;
//! the group is not reusable.
//!
//! The counter is signed and never clamped: extra `done()` calls drive it
//! below zero without error. A group that has been over-released and is then
//! handed out again looks complete to every later waiter, so a stray `done()`
//! silently desynchronizes it. Keep add/done balanced per owner.

use crate::error::ScopeError;
use crate::scope::Scope;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Observable one-shot completion signal
#[derive(Debug, Clone)]
pub struct Signal {
    token: CancellationToken,
}

impl Signal {
    fn pending() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    fn fired() -> Self {
        let signal = Self::pending();
        signal.token.cancel();
        signal
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has fired
    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}

#[derive(Debug)]
struct Inner {
    count: AtomicI64,
    closed: AtomicBool,
    signal: Signal,
}

/// Counts outstanding work and signals when it drains
#[derive(Debug, Clone)]
pub struct CompletionGroup {
    inner: Arc<Inner>,
}

impl CompletionGroup {
    /// New group with nothing outstanding
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                count: AtomicI64::new(0),
                closed: AtomicBool::new(false),
                signal: Signal::pending(),
            }),
        }
    }

    /// Adjust the outstanding count by `delta`
    ///
    /// Fires the signal when the result is zero or below. Negative results
    /// are accepted (see module docs).
    pub fn add(&self, delta: i64) {
        let count = self.inner.count.fetch_add(delta, Ordering::AcqRel) + delta;
        if count < 0 {
            tracing::debug!(count, delta, "completion group released below zero");
        }
        if count <= 0 {
            self.close();
        }
    }

    /// Mark one unit finished
    pub fn done(&self) {
        self.add(-1);
    }

    /// Current outstanding count
    pub fn count(&self) -> i64 {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait until the group drains or `scope` ends
    ///
    /// Returns immediately when nothing is outstanding, even if `add` was
    /// never called.
    pub async fn wait(&self, scope: &Scope) -> Result<(), ScopeError> {
        if self.count() <= 0 {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.inner.signal.wait() => Ok(()),
            reason = scope.done() => Err(reason),
        }
    }

    /// Handle to the completion signal
    ///
    /// When nothing is outstanding the returned signal has already fired, so
    /// a late observer never blocks.
    pub fn signal(&self) -> Signal {
        if self.count() <= 0 {
            return Signal::fired();
        }
        self.inner.signal.clone()
    }

    fn close(&self) {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.inner.signal.token.cancel();
        }
    }
}

impl Default for CompletionGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
