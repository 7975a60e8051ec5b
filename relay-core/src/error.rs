//! Error types for the broadcast primitives.
//!
//! Only two things can go wrong when talking to a [`Broadcaster`]:
//!
//! - a caller hands over an absent value, which is returned as
//!   [`BroadcastError::InvalidArgument`], and
//! - a caller publishes while nobody listens. That is a misuse, not a
//!   failure: it is never returned, only routed to the broadcaster's
//!   [`ErrorReporter`](crate::report::ErrorReporter).
//!
//! [`Broadcaster`]: crate::broadcast::Broadcaster

use thiserror::Error;

/// Errors produced by a [`Broadcaster`](crate::broadcast::Broadcaster).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The published value was absent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A value was published while zero subscriptions were active.
    #[error("publishing without any active subscription")]
    NoSubscribers,
}

impl BroadcastError {
    /// Returns `true` for misuse conditions that are reported rather than returned.
    pub fn is_misuse(&self) -> bool {
        matches!(self, BroadcastError::NoSubscribers)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BroadcastError>;
