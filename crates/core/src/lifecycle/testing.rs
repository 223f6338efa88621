// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counting provider shared by the lifecycle tests

use super::{Manager, Provider};
use crate::scope::Scope;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, PartialEq)]
pub(crate) struct Conn {
    pub id: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("connection refused (attempt {attempt})")]
pub(crate) struct Refused {
    pub attempt: usize,
}

/// What the heartbeat callback does on each tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum OnTick {
    Nothing,
    Stop,
}

/// Teardown as observed by the provider
#[derive(Clone, Debug)]
pub(crate) struct TeardownRecord {
    pub id: usize,
    pub cancelled: bool,
    pub trace_id: uuid::Uuid,
}

pub(crate) struct CountingProvider {
    pub constructs: AtomicUsize,
    pub ticks: AtomicUsize,
    pub fail: AtomicBool,
    pub delay: Duration,
    pub on_tick: OnTick,
    pub teardowns: Mutex<Vec<TeardownRecord>>,
    pub seen_field: Mutex<Option<String>>,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            constructs: AtomicUsize::new(0),
            ticks: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: Duration::ZERO,
            on_tick: OnTick::Nothing,
            teardowns: Mutex::new(Vec::new()),
            seen_field: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_on_tick(mut self, on_tick: OnTick) -> Self {
        self.on_tick = on_tick;
        self
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn construct_count(&self) -> usize {
        self.constructs.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> Vec<TeardownRecord> {
        self.teardowns.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for CountingProvider {
    type Resource = Conn;
    type Error = Refused;

    async fn construct(
        &self,
        scope: &Scope,
        _manager: &Manager<Conn, Refused>,
    ) -> Result<Conn, Refused> {
        let attempt = self.constructs.fetch_add(1, Ordering::SeqCst) + 1;
        *self.seen_field.lock().unwrap() = scope.field("owner").map(str::to_string);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Refused { attempt });
        }
        Ok(Conn { id: attempt })
    }

    async fn teardown(&self, scope: &Scope, resource: Arc<Conn>) {
        self.teardowns.lock().unwrap().push(TeardownRecord {
            id: resource.id,
            cancelled: scope.is_cancelled(),
            trace_id: scope.trace_id(),
        });
    }

    async fn heartbeat(&self, scope: &Scope, manager: &Manager<Conn, Refused>) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if self.on_tick == OnTick::Stop {
            manager.stop(scope).await;
        }
    }
}
