// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::net::SocketAddr;
use std::time::Instant;

use tether_adapters::{TcpProvider, TracedProvider};
use tether_core::{ResourceLifecycle, Scope, Supervisor, SupervisorError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DaemonConfig, EndpointConfig};

/// Endpoint lifecycle with the concrete provider stack (wrapped with tracing)
pub type Endpoint = ResourceLifecycle<TracedProvider<TcpProvider>>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("log path {0} has no parent directory or file name")]
    LogPath(std::path::PathBuf),
    #[error(transparent)]
    Shutdown(#[from] SupervisorError),
}

/// Connection state of one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub name: String,
    pub peer: Option<SocketAddr>,
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: DaemonConfig,
    supervisor: Supervisor,
    endpoints: Vec<Endpoint>,
    /// When daemon started
    pub start_time: Instant,
}

fn endpoint(config: &EndpointConfig, operating: Scope) -> Endpoint {
    let provider = TcpProvider::new(config.address.clone())
        .with_connect_timeout(config.connect_timeout)
        .with_reconnect_timeout(config.connect_timeout);
    ResourceLifecycle::with_operating_scope(
        TracedProvider::new(provider),
        config.lifecycle_config(),
        operating,
    )
}

/// Build every endpoint, connect them, and start their heartbeats
///
/// A failed initial connect is logged, not returned; the endpoint's heartbeat
/// keeps retrying.
pub async fn startup(config: DaemonConfig, root: &Scope) -> DaemonState {
    let start_time = Instant::now();
    let supervisor = Supervisor::new(root);

    let endpoints: Vec<Endpoint> = config
        .endpoints
        .iter()
        .map(|ep| endpoint(ep, supervisor.scope().with_field("endpoint", ep.name.clone())))
        .collect();

    let connects = endpoints.iter().zip(&config.endpoints).map(|(lifecycle, ep)| {
        let scope = root.with_timeout(ep.connect_timeout);
        async move {
            match lifecycle.construct(&scope).await {
                Ok(conn) => info!(endpoint = %ep.name, peer = %conn.peer(), "connected"),
                Err(e) => warn!(endpoint = %ep.name, error = %e, "initial connect failed, will retry"),
            }
        }
    });
    futures::future::join_all(connects).await;

    for lifecycle in &endpoints {
        supervisor.watch(lifecycle);
    }

    info!(
        endpoints = endpoints.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "startup complete"
    );

    DaemonState {
        config,
        supervisor,
        endpoints,
        start_time,
    }
}

impl DaemonState {
    /// Current connection state of every endpoint, in config order
    pub fn status(&self) -> Vec<EndpointStatus> {
        self.endpoints
            .iter()
            .map(|lifecycle| EndpointStatus {
                name: lifecycle.name().to_string(),
                peer: lifecycle.load().map(|conn| conn.peer()),
            })
            .collect()
    }

    /// Shutdown the daemon gracefully
    ///
    /// Stops every heartbeat and waits up to the configured timeout for the
    /// connections to be torn down.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        let uptime = self.start_time.elapsed();
        self.supervisor.shutdown(self.config.shutdown_timeout).await?;
        info!(uptime_secs = uptime.as_secs(), "all endpoints torn down");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
