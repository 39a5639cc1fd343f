//! Shutdown coordination.
//!
//! # Responsibilities
//! - Collect cleanup callbacks as resources come up during bootstrap
//!   and listen
//! - Run them in strict reverse registration order at close
//! - Attempt every callback even when one fails, then surface the
//!   failures as one aggregate error
//!
//! # Design Decisions
//! - Reverse order releases resources opposite to acquisition (stop
//!   accepting connections before tearing down what routes them)
//! - Callbacks run at most once; a second `run_all` is a no-op

use futures_util::future::BoxFuture;
use std::future::Future;
use thiserror::Error;

/// Error type cleanup callbacks may return.
pub type CleanupError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), CleanupError>> + Send>;

/// One callback that failed during shutdown.
#[derive(Debug)]
pub struct CallbackFailure {
    pub name: String,
    pub error: CleanupError,
}

/// Aggregate of every cleanup failure from one shutdown pass.
#[derive(Debug, Error)]
#[error("shutdown incomplete: {} callback(s) failed", .failures.len())]
pub struct ShutdownError {
    pub failures: Vec<CallbackFailure>,
}

/// Registry of cleanup callbacks run in reverse order at close.
#[derive(Default)]
pub struct ShutdownCoordinator {
    callbacks: Vec<(String, Callback)>,
    ran: bool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named cleanup callback. Later registrations run first.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CleanupError>> + Send + 'static,
    {
        self.callbacks
            .push((name.into(), Box::new(move || Box::pin(callback()))));
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every registered callback in reverse registration order.
    ///
    /// Each callback is awaited to completion before the next starts.
    /// Failures are collected, not propagated mid-pass.
    pub async fn run_all(&mut self) -> Result<(), ShutdownError> {
        if self.ran {
            return Ok(());
        }
        self.ran = true;

        let mut failures = Vec::new();
        while let Some((name, callback)) = self.callbacks.pop() {
            tracing::debug!(callback = %name, "running shutdown callback");
            if let Err(error) = callback().await {
                tracing::error!(callback = %name, error = %error, "shutdown callback failed");
                failures.push(CallbackFailure { name, error });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }
}
