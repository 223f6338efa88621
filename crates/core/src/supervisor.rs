// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat supervision
//!
//! A [`Supervisor`] runs the heartbeat of every lifecycle it watches under one
//! shared scope and waits for all of their teardowns at shutdown.

use crate::error::SupervisorError;
use crate::group::CompletionGroup;
use crate::lifecycle::{Provider, ResourceLifecycle};
use crate::scope::Scope;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument};

pub struct Supervisor {
    scope: Scope,
    group: CompletionGroup,
    watched: Mutex<Vec<String>>,
}

impl Supervisor {
    /// Supervisor whose heartbeats stop when `parent` ends or on [`shutdown`](Self::shutdown)
    pub fn new(parent: &Scope) -> Self {
        Self {
            scope: parent.child(),
            group: CompletionGroup::new(),
            watched: Mutex::new(Vec::new()),
        }
    }

    /// Scope the heartbeats run under
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Names of every lifecycle watched so far
    pub fn watched(&self) -> Vec<String> {
        self.watched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Start `lifecycle`'s heartbeat on its own task
    pub fn watch<P: Provider>(&self, lifecycle: &ResourceLifecycle<P>) {
        self.group.add(1);
        self.watched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(lifecycle.name().to_string());

        let lifecycle = lifecycle.clone();
        let scope = self.scope.clone();
        let group = self.group.clone();
        let span = scope.span();
        tokio::spawn(async move { lifecycle.heartbeat(scope, group).await }.instrument(span));
    }

    /// Stop every heartbeat and wait up to `timeout` for their teardowns
    pub async fn shutdown(self, timeout: Duration) -> Result<(), SupervisorError> {
        let start = Instant::now();
        info!(watched = self.group.count(), "supervisor shutting down");
        self.scope.cancel();

        let bound = Scope::background().with_timeout(timeout);
        match self.group.wait(&bound).await {
            Ok(()) => {
                info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "supervisor shut down"
                );
                Ok(())
            }
            Err(_) => {
                let elapsed = start.elapsed();
                let remaining = self.group.count();
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    remaining, "supervisor shutdown timed out"
                );
                Err(SupervisorError::ShutdownTimeout { elapsed, remaining })
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
