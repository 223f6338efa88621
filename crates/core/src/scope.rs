// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation scopes with inherited diagnostic metadata
//!
//! A [`Scope`] bounds how long some piece of work may run. Scopes form a tree:
//! cancelling a parent cancels every child, and a child's deadline never
//! outlives its parent's. Every scope also carries a trace id and a small set
//! of key/value fields that are attached to log output.
//!
//! [`Scope::detached`] produces a scope that keeps the metadata but drops the
//! cancellation, for cleanup that has to finish after the requester gave up.

use crate::error::ScopeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Diagnostic metadata shared by a scope and everything derived from it
#[derive(Debug, Clone)]
struct Metadata {
    trace_id: Uuid,
    fields: Vec<(String, String)>,
}

/// A cancellable, optionally time-bounded execution scope
#[derive(Debug, Clone)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<Instant>,
    metadata: Arc<Metadata>,
}

impl Scope {
    /// Root scope: never cancelled on its own, no deadline, fresh trace id
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            metadata: Arc::new(Metadata {
                trace_id: Uuid::new_v4(),
                fields: Vec::new(),
            }),
        }
    }

    /// Child scope, cancelled whenever this one is
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            metadata: self.metadata.clone(),
        }
    }

    /// Child scope that also expires after `timeout`
    ///
    /// The parent's deadline still applies if it is earlier.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            metadata: self.metadata.clone(),
        }
    }

    /// Child scope carrying one more diagnostic field
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut metadata = (*self.metadata).clone();
        metadata.fields.push((key.into(), value.into()));
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            metadata: Arc::new(metadata),
        }
    }

    /// Scope with the same metadata but none of the cancellation
    ///
    /// Cancelling `self` (or any of its ancestors) has no effect on the
    /// returned scope, and it has no deadline.
    pub fn detached(&self) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Cancel this scope and all of its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline
    pub fn is_cancelled(&self) -> bool {
        self.error().is_some()
    }

    /// Why the scope ended, or `None` while it is still live
    pub fn error(&self) -> Option<ScopeError> {
        if self.token.is_cancelled() {
            return Some(ScopeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ScopeError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the scope ends, with the reason it ended
    pub async fn done(&self) -> ScopeError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => ScopeError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ScopeError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ScopeError::Cancelled
            }
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn trace_id(&self) -> Uuid {
        self.metadata.trace_id
    }

    /// Value of the most recently added field named `key`
    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata
            .fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.metadata.fields
    }

    /// Tracing span tagged with this scope's metadata
    pub fn span(&self) -> tracing::Span {
        let fields = self
            .metadata
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info_span!("scope", trace_id = %self.metadata.trace_id, fields = %fields)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
