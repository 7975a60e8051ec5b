//! Relay Core
//!
//! This crate provides the action relay used by the Relay state-management
//! runtime: a lock-free, multicast broadcaster that carries values from one
//! publisher to every currently subscribed listener.
//!
//! It implements:
//!
//! - A copy-on-write, compare-and-swap subscriber list (no locks on any path)
//! - Idempotent, thread-safe subscription cancellation
//! - Injectable reporting for publishes nobody listens to
//! - An async `Stream` adapter on top of tokio channels
//!
//! The crate is designed to be used both as a native Rust library and, with
//! the `python` feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! - `broadcast`: Broadcaster, subscriptions, and listeners
//! - `report`: Misuse reporters
//! - `config`: Serde-friendly construction settings
//! - `error`: Error taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_core::Broadcaster;
//!
//! let actions = Broadcaster::named("actions");
//!
//! let subscription = actions.subscribe_fn(|action: &&str| {
//!     println!("action: {action}");
//! });
//!
//! actions.publish("increment");
//! // prints "action: increment"
//!
//! subscription.cancel();
//! actions.publish("increment");
//! // nobody listens: logged as a warning, nothing is delivered
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod report;

#[cfg(feature = "python")]
mod python;

pub use broadcast::{
    Broadcaster, Listener, ListenerStream, RecordingListener, Subscription, SubscriptionGuard,
    SubscriptionId, WeakBroadcaster,
};
pub use config::{BroadcasterConfig, MisusePolicy};
pub use error::{BroadcastError, Result};
pub use report::{CallbackReporter, ErrorReporter, LogReporter, NoopReporter, PanicReporter};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types and functions.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyBroadcaster>()?;
    m.add_class::<python::PySubscription>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
