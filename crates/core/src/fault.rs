// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured panic payloads shared between tasks

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

/// A panic captured from one task and handed to others by reference
///
/// Clones share the original payload, so callers can compare faults by
/// identity with [`Fault::ptr_eq`] and inspect the payload type with
/// [`Fault::is`] / [`Fault::downcast`].
#[derive(Clone)]
pub struct Fault {
    inner: Arc<FaultInner>,
}

struct FaultInner {
    message: String,
    // Mutex makes the Send-only payload shareable
    payload: Mutex<Box<dyn Any + Send>>,
}

impl Fault {
    /// Wrap the payload returned by `catch_unwind`
    ///
    /// A payload that is already a `Fault` (a re-raised fault) is returned
    /// as-is so its identity survives nested calls.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<Fault>() {
            Ok(fault) => return *fault,
            Err(payload) => payload,
        };
        let message = panic_message(payload.as_ref());
        Self {
            inner: Arc::new(FaultInner {
                message,
                payload: Mutex::new(payload),
            }),
        }
    }

    /// Fault with a plain message payload, for failures that never panicked
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            inner: Arc::new(FaultInner {
                payload: Mutex::new(Box::new(message.clone())),
                message,
            }),
        }
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// True if the original payload is a `P`
    pub fn is<P: Any>(&self) -> bool {
        self.payload().is::<P>()
    }

    /// Copy of the original payload, if it is a `P`
    pub fn downcast<P: Any + Clone>(&self) -> Option<P> {
        self.payload().downcast_ref::<P>().cloned()
    }

    /// True if both handles refer to the same captured panic
    pub fn ptr_eq(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Re-raise in the current task
    ///
    /// The unwinding payload is the `Fault` itself, so an upstream
    /// `catch_unwind` can recover it with `downcast::<Fault>()`.
    pub fn resume(self) -> ! {
        std::panic::resume_unwind(Box::new(self))
    }

    fn payload(&self) -> std::sync::MutexGuard<'_, Box<dyn Any + Send>> {
        self.inner
            .payload
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.inner.message)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "fault_tests.rs"]
mod tests;
