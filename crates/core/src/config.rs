// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Heartbeat period used when none is configured
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

fn default_heartbeat_interval() -> Duration {
    DEFAULT_HEARTBEAT_INTERVAL
}

/// Settings for one [`ResourceLifecycle`](crate::ResourceLifecycle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Name used in logs and spans
    pub name: String,
    /// Time between heartbeat callbacks (e.g., "500ms", "30s")
    #[serde(with = "humantime_serde", default = "default_heartbeat_interval")]
    pub heartbeat_interval: Duration,
}

impl LifecycleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
