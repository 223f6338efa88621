// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by the coordination primitives

use crate::fault::Fault;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a [`Scope`](crate::Scope) ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("scope cancelled")]
    Cancelled,
    #[error("scope deadline exceeded")]
    DeadlineExceeded,
}

/// Outcome of a deduplicated call that did not produce a value
///
/// `Wait` is local to the caller that gave up. `Failed` and `Panicked` are
/// shared: every caller attached to the same call receives the same `Arc`.
#[derive(Debug, Error)]
pub enum CallError<E> {
    #[error("gave up waiting: {0}")]
    Wait(#[from] ScopeError),
    #[error("{0}")]
    Failed(Arc<E>),
    #[error("operation panicked: {0}")]
    Panicked(Fault),
}

impl<E> CallError<E> {
    /// The shared operation error, if the operation itself failed
    pub fn failure(&self) -> Option<&Arc<E>> {
        match self {
            CallError::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// The captured panic, if the operation panicked
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            CallError::Panicked(f) => Some(f),
            _ => None,
        }
    }

    /// True when only this caller's wait ended, not the operation
    pub fn is_wait(&self) -> bool {
        matches!(self, CallError::Wait(_))
    }
}

impl<E> Clone for CallError<E> {
    fn clone(&self) -> Self {
        match self {
            CallError::Wait(e) => CallError::Wait(*e),
            CallError::Failed(e) => CallError::Failed(e.clone()),
            CallError::Panicked(f) => CallError::Panicked(f.clone()),
        }
    }
}

/// Errors from [`Supervisor::shutdown`](crate::Supervisor::shutdown)
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("shutdown timed out after {elapsed:?}, {remaining} heartbeat(s) still tearing down")]
    ShutdownTimeout { elapsed: Duration, remaining: i64 },
}
