// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callbacks a subsystem supplies to manage its resource

use super::Manager;
use crate::scope::Scope;
use async_trait::async_trait;
use std::sync::Arc;

/// Builds, checks, and tears down one kind of resource handle
///
/// A database pool, a queue client, or a socket plugs into a
/// [`ResourceLifecycle`](super::ResourceLifecycle) by implementing this trait.
/// The [`Manager`] is keyed on the resource and error types only, so a
/// wrapping provider can hand the same manager to the provider it wraps.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    type Resource: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a new handle
    ///
    /// Runs under the lifecycle's operating scope, not the scope of whichever
    /// caller triggered it. `manager` may be used to load or build other
    /// resources; constructing this same lifecycle from here waits on itself
    /// until the scope passed to that inner call ends.
    async fn construct(
        &self,
        scope: &Scope,
        manager: &Manager<Self::Resource, Self::Error>,
    ) -> Result<Self::Resource, Self::Error>;

    /// Release a handle that was evicted
    ///
    /// `scope` is detached from whatever cancellation triggered the eviction.
    async fn teardown(&self, scope: &Scope, resource: Arc<Self::Resource>);

    /// Periodic check; may store, stop, or rebuild through `manager`
    async fn heartbeat(&self, scope: &Scope, manager: &Manager<Self::Resource, Self::Error>) {
        let _ = (scope, manager);
    }
}
