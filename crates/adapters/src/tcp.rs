// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP connection provider
//!
//! Keeps one client connection to an address alive. The heartbeat probes the
//! socket without blocking; once the peer has closed it, the connection is
//! torn down and a new one is built in its place.

use async_trait::async_trait;
use futures::FutureExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{Manager, Provider, Scope, ScopeError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from building a TCP connection
#[derive(Debug, Error)]
pub enum TcpError {
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connect to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },
    #[error("connect to {address} abandoned: {reason}")]
    Abandoned { address: String, reason: ScopeError },
}

/// One established client connection
#[derive(Debug)]
pub struct TcpConnection {
    stream: Mutex<TcpStream>,
    peer: SocketAddr,
    local: SocketAddr,
}

impl TcpConnection {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Probe the socket without waiting for data
    ///
    /// False once the peer has closed the connection or the socket errored.
    /// Pending data is left unread.
    pub async fn is_alive(&self) -> bool {
        let stream = self.stream.lock().await;
        let mut buf = [0u8; 1];
        match stream.peek(&mut buf).now_or_never() {
            None => true,
            Some(Ok(0)) => false,
            Some(Ok(_)) => true,
            Some(Err(e)) => {
                debug!(peer = %self.peer, error = %e, "probe failed");
                false
            }
        }
    }

    pub async fn write_all(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.lock().await.write_all(bytes).await
    }

    /// Close the write half; the peer reads end-of-stream
    pub async fn shutdown(&self) -> std::io::Result<()> {
        self.stream.lock().await.shutdown().await
    }
}

/// Provider of a [`TcpConnection`] to one address
#[derive(Debug, Clone)]
pub struct TcpProvider {
    address: String,
    connect_timeout: Duration,
    reconnect_timeout: Duration,
}

impl TcpProvider {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Bound on each connection attempt
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// How long the heartbeat waits for a replacement connection
    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connect_error(&self, source: std::io::Error) -> TcpError {
        TcpError::Connect {
            address: self.address.clone(),
            source,
        }
    }
}

#[async_trait]
impl Provider for TcpProvider {
    type Resource = TcpConnection;
    type Error = TcpError;

    async fn construct(
        &self,
        scope: &Scope,
        _manager: &Manager<TcpConnection, TcpError>,
    ) -> Result<TcpConnection, TcpError> {
        let connect = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.address.as_str()),
        );
        let stream = tokio::select! {
            biased;
            reason = scope.done() => {
                return Err(TcpError::Abandoned {
                    address: self.address.clone(),
                    reason,
                });
            }
            result = connect => match result {
                Ok(Ok(stream)) => stream,
                Ok(Err(source)) => return Err(self.connect_error(source)),
                Err(_) => {
                    return Err(TcpError::Timeout {
                        address: self.address.clone(),
                        timeout: self.connect_timeout,
                    });
                }
            },
        };

        let peer = stream.peer_addr().map_err(|e| self.connect_error(e))?;
        let local = stream.local_addr().map_err(|e| self.connect_error(e))?;
        debug!(%peer, %local, "connected");
        Ok(TcpConnection {
            stream: Mutex::new(stream),
            peer,
            local,
        })
    }

    async fn teardown(&self, _scope: &Scope, resource: Arc<TcpConnection>) {
        if let Err(e) = resource.shutdown().await {
            // The peer may already be gone
            debug!(peer = %resource.peer(), error = %e, "shutdown failed");
        }
    }

    async fn heartbeat(&self, scope: &Scope, manager: &Manager<TcpConnection, TcpError>) {
        match manager.load() {
            Some(conn) if conn.is_alive().await => return,
            Some(conn) => {
                warn!(resource = manager.name(), peer = %conn.peer(), "connection lost");
                drop(conn);
                manager.stop(scope).await;
            }
            None => debug!(resource = manager.name(), "no connection"),
        }

        let bounded = scope.with_timeout(self.reconnect_timeout);
        match manager.construct(&bounded).await {
            Ok(conn) => info!(resource = manager.name(), peer = %conn.peer(), "reconnected"),
            Err(e) => warn!(resource = manager.name(), error = %e, "reconnect failed"),
        }
    }
}

#[cfg(test)]
#[path = "tcp_tests.rs"]
mod tests;
