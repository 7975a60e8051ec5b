//! Subscription Implementation
//!
//! A [`Subscription`] is the caller's half of a listener registration. The
//! broadcaster keeps the other half (the shared `Entry`) in its snapshot.
//!
//! # Lifecycle
//!
//! ```text
//!   subscribe()            cancel() (first caller wins the CAS)
//!  ─────────────► Active ───────────────────────────────► Cancelled
//!                                    │
//!                                    └─► broadcaster removes the entry
//! ```
//!
//! The cancelled flag is checked before every delivery, so a cancelled entry
//! that is still present in an in-flight snapshot is skipped.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::broadcaster::Shared;
use super::listener::Listener;

/// Unique identifier for a subscription.
///
/// Identity inside the broadcaster is pointer identity; the ID exists for
/// diagnostics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broadcaster-side record of one listener.
pub(crate) struct Entry<T> {
    id: SubscriptionId,
    listener: Box<dyn Listener<T>>,
    cancelled: AtomicBool,
    /// Only used to request removal; never keeps the broadcaster alive.
    parent: Weak<Shared<T>>,
}

impl<T> Entry<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(listener: Box<dyn Listener<T>>, parent: Weak<Shared<T>>) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriptionId::next(),
            listener,
            cancelled: AtomicBool::new(false),
            parent,
        })
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn listener(&self) -> &dyn Listener<T> {
        self.listener.as_ref()
    }

    /// Delivery gate used by publish.
    pub(crate) fn deliver(&self, value: &T) {
        if !self.is_cancelled() {
            self.listener.on_value(value);
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(self: &Arc<Self>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        tracing::trace!(subscription = %self.id, "subscription cancelled");

        // A dead broadcaster already dropped its snapshot, entry included.
        if let Some(parent) = self.parent.upgrade() {
            parent.remove(self);
        }
    }
}

/// Cancellation handle for one listener registration.
///
/// Returned by [`Broadcaster::subscribe`](super::Broadcaster::subscribe).
/// Handles are cheap to clone; clones refer to the same registration.
/// Dropping a handle does **not** cancel the registration, use
/// [`Subscription::into_guard`] for that.
pub struct Subscription<T> {
    entry: Arc<Entry<T>>,
}

impl<T> Subscription<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn from_entry(entry: Arc<Entry<T>>) -> Self {
        Self { entry }
    }

    #[cfg(test)]
    pub(crate) fn entry(&self) -> &Arc<Entry<T>> {
        &self.entry
    }

    pub(crate) fn downgrade(&self) -> Weak<Entry<T>> {
        Arc::downgrade(&self.entry)
    }

    /// Get the subscription's unique ID.
    pub fn id(&self) -> SubscriptionId {
        self.entry.id()
    }

    /// Stop receiving values.
    ///
    /// Idempotent and callable from any thread. Only the first call removes
    /// the registration from the broadcaster; later calls return immediately.
    /// Safe to call after the broadcaster has been dropped.
    pub fn cancel(&self) {
        self.entry.cancel();
    }

    /// Check whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.entry.is_cancelled()
    }

    /// Convert into a guard that cancels when dropped.
    pub fn into_guard(self) -> SubscriptionGuard<T> {
        SubscriptionGuard {
            subscription: Some(self),
        }
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T> PartialEq for Subscription<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl<T> Eq for Subscription<T> {}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("cancelled", &self.entry.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}

/// Cancels its subscription when dropped.
///
/// Dropping this guard unregisters the listener from the broadcaster.
#[must_use = "dropping the guard cancels the subscription immediately"]
pub struct SubscriptionGuard<T>
where
    T: Send + Sync + 'static,
{
    subscription: Option<Subscription<T>>,
}

impl<T> SubscriptionGuard<T>
where
    T: Send + Sync + 'static,
{
    /// Borrow the guarded subscription.
    pub fn subscription(&self) -> Option<&Subscription<T>> {
        self.subscription.as_ref()
    }

    /// Release the subscription without cancelling it.
    pub fn disarm(mut self) -> Option<Subscription<T>> {
        self.subscription.take()
    }
}

impl<T> Drop for SubscriptionGuard<T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
