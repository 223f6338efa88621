// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file
//!
//! ```toml
//! log_path = "/var/log/tetherd.log"
//! shutdown_timeout = "10s"
//!
//! [[endpoint]]
//! name = "cache"
//! address = "127.0.0.1:6379"
//! heartbeat_interval = "5s"
//! connect_timeout = "2s"
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_adapters::DEFAULT_CONNECT_TIMEOUT;
use tether_core::{LifecycleConfig, DEFAULT_HEARTBEAT_INTERVAL};
use thiserror::Error;

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config declares no endpoints")]
    NoEndpoints,
    #[error("endpoint {0:?} is declared more than once")]
    DuplicateEndpoint(String),
    #[error("endpoint {0:?} has an empty address")]
    EmptyAddress(String),
    #[error("endpoint {0:?} has a zero {1}")]
    ZeroDuration(String, &'static str),
}

fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}

fn default_heartbeat_interval() -> Duration {
    DEFAULT_HEARTBEAT_INTERVAL
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

/// Top-level daemon settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Log file; logs go to stderr when unset
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// How long shutdown waits for every endpoint to tear down
    #[serde(with = "humantime_serde", default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,
    #[serde(default, rename = "endpoint")]
    pub endpoints: Vec<EndpointConfig>,
}

/// One TCP endpoint kept connected by the daemon
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub name: String,
    /// `host:port`
    pub address: String,
    #[serde(with = "humantime_serde", default = "default_heartbeat_interval")]
    pub heartbeat_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl DaemonConfig {
    /// Read, parse, and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse and validate config text; `path` is used in error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint.name.as_str()) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.name.clone()));
            }
            if endpoint.address.trim().is_empty() {
                return Err(ConfigError::EmptyAddress(endpoint.name.clone()));
            }
            if endpoint.heartbeat_interval.is_zero() {
                return Err(ConfigError::ZeroDuration(
                    endpoint.name.clone(),
                    "heartbeat_interval",
                ));
            }
            if endpoint.connect_timeout.is_zero() {
                return Err(ConfigError::ZeroDuration(
                    endpoint.name.clone(),
                    "connect_timeout",
                ));
            }
        }
        Ok(())
    }
}

impl EndpointConfig {
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig::new(self.name.clone()).with_heartbeat_interval(self.heartbeat_interval)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
