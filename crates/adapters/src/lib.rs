// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Providers for real resources, plus tracing and test wrappers

pub mod tcp;
pub mod traced;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use tcp::{TcpConnection, TcpError, TcpProvider, DEFAULT_CONNECT_TIMEOUT};
pub use traced::TracedProvider;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeError, FakeProvider, FakeResource, ProviderCall};
