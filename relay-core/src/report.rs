//! Misuse Reporting
//!
//! A broadcaster never fails a publish because nobody is listening. Instead it
//! hands a [`BroadcastError`] to the [`ErrorReporter`] it was constructed with
//! and carries on.
//!
//! # Built-in Reporters
//!
//! - [`LogReporter`]: emits a `tracing` warning (the default).
//! - [`NoopReporter`]: swallows the report.
//! - [`PanicReporter`]: escalates the report into a panic. Only useful in
//!   debug builds and tests where misuse should crash loudly.
//! - [`CallbackReporter`]: forwards the report to a user closure.
//!
//! Reporters are shared as `Arc<dyn ErrorReporter>`, so one reporter can be
//! injected into many broadcasters.

use std::fmt;
use std::sync::Arc;

use crate::error::BroadcastError;

/// Sink for misuse conditions detected by a broadcaster.
pub trait ErrorReporter: Send + Sync {
    /// Receive one report. Called synchronously on the publishing thread.
    fn report(&self, error: &BroadcastError);
}

/// Reports misuse as a `tracing` warning.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    name: Option<String>,
}

impl LogReporter {
    /// Create a reporter tagging its warnings with the given broadcaster name.
    pub fn new(name: Option<String>) -> Self {
        Self { name }
    }
}

impl ErrorReporter for LogReporter {
    fn report(&self, error: &BroadcastError) {
        tracing::warn!(
            broadcaster = self.name.as_deref().unwrap_or("<unnamed>"),
            "{error}"
        );
    }
}

/// Ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &BroadcastError) {}
}

/// Turns every report into a panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter;

impl ErrorReporter for PanicReporter {
    fn report(&self, error: &BroadcastError) {
        panic!("{error}");
    }
}

/// Forwards reports to a closure.
pub struct CallbackReporter<F> {
    callback: F,
}

impl<F> CallbackReporter<F>
where
    F: Fn(&BroadcastError) + Send + Sync + 'static,
{
    /// Wrap a closure as a reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }

    /// Wrap a closure and erase it into a shareable reporter.
    pub fn shared(callback: F) -> Arc<dyn ErrorReporter> {
        Arc::new(Self::new(callback))
    }
}

impl<F> ErrorReporter for CallbackReporter<F>
where
    F: Fn(&BroadcastError) + Send + Sync,
{
    fn report(&self, error: &BroadcastError) {
        (self.callback)(error);
    }
}

impl<F> fmt::Debug for CallbackReporter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackReporter").finish_non_exhaustive()
    }
}
