//! Broadcast Primitives
//!
//! This module implements the multicast relay used to carry actions from the
//! UI into a state container: a [`Broadcaster`] that fans values out to any
//! number of [`Listener`]s, and the [`Subscription`] handles that let those
//! listeners leave again.
//!
//! # Concepts
//!
//! ## Broadcaster
//!
//! A Broadcaster is a hot, fire-and-forget source. Values published while a
//! listener is subscribed reach that listener; values published before it
//! subscribed are gone. Nothing is buffered or replayed.
//!
//! Listeners that talk back to their own broadcaster hold a
//! [`WeakBroadcaster`] so the broadcaster can still be freed.
//!
//! ## Subscription
//!
//! A Subscription is the handle returned when a listener joins. Cancelling it
//! is idempotent and works from any thread, including from inside a listener
//! callback.
//!
//! ## Misuse Reporting
//!
//! Publishing while nobody is subscribed is treated as a likely bug in the
//! application wiring and is handed to an injected
//! [`ErrorReporter`](crate::report::ErrorReporter) instead of failing the call.
//!
//! # Implementation Notes
//!
//! The subscription list is a copy-on-write `Vec` published through
//! `arc_swap`. Every structural change installs a whole new list with a
//! compare-and-swap and retries on contention, so there are no locks anywhere
//! on the publish, subscribe, or cancel paths.

mod broadcaster;
mod listener;
mod stream;
mod subscription;

pub use broadcaster::{Broadcaster, WeakBroadcaster};
pub use listener::{Listener, RecordingListener};
pub use stream::ListenerStream;
pub use subscription::{Subscription, SubscriptionGuard, SubscriptionId};
