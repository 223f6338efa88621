// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-core: coordination primitives for long-lived resource handles
//!
//! This crate provides:
//! - Scopes carrying cancellation, deadlines, and request metadata
//! - A completion group that signals when outstanding work drains
//! - A call deduplicator sharing one execution among concurrent callers
//! - Resource lifecycles that construct lazily, health-check, and tear down once
//! - A supervisor running heartbeats until shutdown

pub mod config;
pub mod dedup;
pub mod error;
pub mod fault;
pub mod group;
pub mod lifecycle;
pub mod scope;
pub mod supervisor;

pub use config::{LifecycleConfig, DEFAULT_HEARTBEAT_INTERVAL};
pub use dedup::CallDeduplicator;
pub use error::{CallError, ScopeError, SupervisorError};
pub use fault::Fault;
pub use group::{CompletionGroup, Signal};
pub use lifecycle::{Manager, Provider, ResourceLifecycle};
pub use scope::Scope;
pub use supervisor::Supervisor;
