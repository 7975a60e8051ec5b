//! Broadcaster Implementation
//!
//! A Broadcaster fans every published value out to the listeners that are
//! subscribed at the moment of publishing.
//!
//! # How Broadcasting Works
//!
//! 1. The active subscriptions live in an immutable `Vec` behind an
//!    [`ArcSwap`]. Nobody ever mutates a published `Vec`.
//!
//! 2. `publish` loads the current `Vec` once and walks it. Concurrent
//!    subscribes and cancels swap in a new `Vec` and never disturb a walk in
//!    progress.
//!
//! 3. `subscribe` and `cancel` build a modified copy and install it with a
//!    compare-and-swap. A failed swap means another writer got there first;
//!    the writer reloads and tries again.
//!
//! # Thread Safety
//!
//! Readers never block and writers never lock. Listeners run on the
//! publishing thread and may re-enter the broadcaster freely.
//!
//! # Ownership
//!
//! The broadcaster owns its listeners. A listener that re-enters the
//! broadcaster must hold a [`WeakBroadcaster`], never a [`Broadcaster`]
//! clone: a strong handle inside a listener keeps the shared state, and with
//! it the listener itself, alive forever.
//!
//! # Misuse
//!
//! Publishing with no subscription is almost always a wiring mistake in the
//! application. It is not returned as an error; the broadcaster hands
//! [`BroadcastError::NoSubscribers`] to its [`ErrorReporter`] and returns.

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use super::listener::{FnListener, Listener, RecordingListener};
use super::subscription::{Entry, Subscription};
use crate::config::BroadcasterConfig;
use crate::error::{BroadcastError, Result};
use crate::report::ErrorReporter;

type Snapshot<T> = Arc<Vec<Arc<Entry<T>>>>;

/// State shared by all clones of a broadcaster.
pub(crate) struct Shared<T> {
    /// Current snapshot of active subscriptions, in subscription order.
    subscriptions: ArcSwap<Vec<Arc<Entry<T>>>>,

    /// Canonical empty snapshot. Removal short-circuits on its identity.
    empty: Snapshot<T>,

    reporter: Arc<dyn ErrorReporter>,

    name: Option<String>,
}

impl<T> Shared<T>
where
    T: Send + Sync + 'static,
{
    fn new(name: Option<String>, reporter: Arc<dyn ErrorReporter>) -> Self {
        let empty: Snapshot<T> = Arc::new(Vec::new());
        Self {
            subscriptions: ArcSwap::new(Arc::clone(&empty)),
            empty,
            reporter,
            name,
        }
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    fn add(&self, entry: &Arc<Entry<T>>) {
        loop {
            let current = self.subscriptions.load_full();

            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(entry));
            let count = next.len();

            let previous = self.subscriptions.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                tracing::trace!(
                    broadcaster = self.name(),
                    subscription = %entry.id(),
                    observers = count,
                    "subscription added"
                );
                return;
            }

            tracing::trace!(broadcaster = self.name(), "add lost race, retrying");
        }
    }

    pub(crate) fn remove(&self, entry: &Arc<Entry<T>>) {
        loop {
            let current = self.subscriptions.load_full();
            if Arc::ptr_eq(&current, &self.empty) {
                return;
            }

            let Some(index) = current.iter().position(|e| Arc::ptr_eq(e, entry)) else {
                return;
            };

            let next = if current.len() == 1 {
                Arc::clone(&self.empty)
            } else {
                let mut next = Vec::with_capacity(current.len() - 1);
                next.extend(current[..index].iter().cloned());
                next.extend(current[index + 1..].iter().cloned());
                Arc::new(next)
            };
            let count = next.len();

            let previous = self.subscriptions.compare_and_swap(&current, next);
            if Arc::ptr_eq(&*previous, &current) {
                tracing::trace!(
                    broadcaster = self.name(),
                    subscription = %entry.id(),
                    observers = count,
                    "subscription removed"
                );
                return;
            }

            tracing::trace!(broadcaster = self.name(), "remove lost race, retrying");
        }
    }
}

/// A lock-free multicast value broadcaster.
///
/// # Type Parameters
///
/// - `T`: The published value type. Listeners receive `&T`, so `T` does not
///   need to be `Clone`.
///
/// # Example
///
/// ```rust,ignore
/// let actions = Broadcaster::new();
///
/// let subscription = actions.subscribe_fn(|action: &String| {
///     println!("got {action}");
/// });
///
/// actions.publish("refresh".to_string()); // prints "got refresh"
///
/// subscription.cancel();
/// actions.publish("ignored".to_string()); // reported as misuse
/// ```
pub struct Broadcaster<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Broadcaster<T>
where
    T: Send + Sync + 'static,
{
    /// Create a broadcaster with the default configuration.
    ///
    /// Misuse is logged as a `tracing` warning.
    pub fn new() -> Self {
        Self::with_config(BroadcasterConfig::default())
    }

    /// Create a named broadcaster with the default misuse policy.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_config(BroadcasterConfig::named(name))
    }

    /// Create a broadcaster from configuration.
    pub fn with_config(config: BroadcasterConfig) -> Self {
        let reporter = config.on_misuse.reporter(config.name.clone());
        Self {
            shared: Arc::new(Shared::new(config.name, reporter)),
        }
    }

    /// Create an unnamed broadcaster reporting misuse to `reporter`.
    pub fn with_reporter(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            shared: Arc::new(Shared::new(None, reporter)),
        }
    }

    /// Create a named broadcaster reporting misuse to `reporter`.
    pub fn with_name_and_reporter(
        name: impl Into<String>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(Some(name.into()), reporter)),
        }
    }

    /// The diagnostic name, if one was configured.
    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    /// Deliver `value` to every active subscription.
    ///
    /// Listeners are called synchronously, in subscription order, from one
    /// snapshot taken on entry. Subscriptions cancelled during delivery are
    /// skipped. With no active subscription the call is reported as misuse
    /// and otherwise does nothing.
    pub fn publish(&self, value: T) {
        let snapshot = self.shared.subscriptions.load_full();

        if snapshot.is_empty() {
            self.shared.reporter.report(&BroadcastError::NoSubscribers);
            return;
        }

        for entry in snapshot.iter() {
            entry.deliver(&value);
        }
    }

    /// Publish a value that may be absent.
    ///
    /// `None` is rejected with [`BroadcastError::InvalidArgument`] before any
    /// listener or reporter is involved.
    pub fn try_publish(&self, value: Option<T>) -> Result<()> {
        let value = value.ok_or(BroadcastError::InvalidArgument(
            "published value must not be absent",
        ))?;
        self.publish(value);
        Ok(())
    }

    /// Register a listener.
    ///
    /// The listener's [`on_start`](Listener::on_start) runs before the
    /// registration is installed. If it cancels the subscription, the
    /// registration is dropped again before this returns.
    pub fn subscribe<L>(&self, listener: L) -> Subscription<T>
    where
        L: Listener<T> + 'static,
    {
        let entry = Entry::new(Box::new(listener), Arc::downgrade(&self.shared));
        let subscription = Subscription::from_entry(Arc::clone(&entry));

        entry.listener().on_start(&subscription);

        self.shared.add(&entry);
        if entry.is_cancelled() {
            self.shared.remove(&entry);
        }

        subscription
    }

    /// Register a closure as a listener.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(FnListener::new(f))
    }

    /// Register a fresh [`RecordingListener`] and return it with its handle.
    pub fn subscribe_recording(&self) -> (Subscription<T>, RecordingListener<T>)
    where
        T: Clone,
    {
        let recorder = RecordingListener::new();
        let subscription = self.subscribe(recorder.clone());
        (subscription, recorder)
    }

    /// Number of active subscriptions.
    ///
    /// Advisory only: the value may be stale by the time it is returned.
    pub fn observer_count(&self) -> usize {
        self.shared.subscriptions.load().len()
    }

    /// True if at least one subscription is active. Advisory.
    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }

    /// Create a handle that does not keep the broadcaster alive.
    ///
    /// Listeners that publish, subscribe or cancel through the broadcaster
    /// they are registered with should capture this instead of a clone.
    pub fn downgrade(&self) -> WeakBroadcaster<T> {
        WeakBroadcaster {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl<T> Default for Broadcaster<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("name", &self.shared.name)
            .field("observer_count", &self.shared.subscriptions.load().len())
            .finish()
    }
}

/// Non-owning handle to a [`Broadcaster`].
///
/// Obtained from [`Broadcaster::downgrade`]. Once every `Broadcaster` clone is
/// dropped, [`upgrade`](Self::upgrade) returns `None`.
pub struct WeakBroadcaster<T> {
    shared: Weak<Shared<T>>,
}

impl<T> WeakBroadcaster<T> {
    /// Get a strong handle if the broadcaster is still alive.
    pub fn upgrade(&self) -> Option<Broadcaster<T>> {
        self.shared.upgrade().map(|shared| Broadcaster { shared })
    }
}

impl<T> Clone for WeakBroadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for WeakBroadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBroadcaster")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CallbackReporter;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn counting() -> (Broadcaster<i32>, Arc<AtomicUsize>) {
        let reports = Arc::new(AtomicUsize::new(0));
        let reports_clone = reports.clone();
        let broadcaster = Broadcaster::with_reporter(CallbackReporter::shared(
            move |_: &BroadcastError| {
                reports_clone.fetch_add(1, Ordering::SeqCst);
            },
        ));
        (broadcaster, reports)
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn publish_reaches_all_in_order() {
        let (broadcaster, _) = counting();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let a = log.clone();
        broadcaster.subscribe_fn(move |v| a.lock().push(("a", *v)));
        let b = log.clone();
        broadcaster.subscribe_fn(move |v| b.lock().push(("b", *v)));

        broadcaster.publish(1);
        broadcaster.publish(2);

        assert_eq!(*log.lock(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn observer_count_tracks_subscribes() {
        let (broadcaster, _) = counting();
        assert_eq!(broadcaster.observer_count(), 0);
        assert!(!broadcaster.has_observers());

        broadcaster.subscribe_fn(|_| {});
        assert_eq!(broadcaster.observer_count(), 1);

        broadcaster.subscribe_fn(|_| {});
        assert_eq!(broadcaster.observer_count(), 2);

        broadcaster.subscribe_fn(|_| {});
        broadcaster.subscribe_fn(|_| {});
        assert_eq!(broadcaster.observer_count(), 4);
        assert!(broadcaster.has_observers());
    }

    #[test]
    fn publish_without_subscribers_reports_once() {
        let (broadcaster, reports) = counting();

        broadcaster.publish(1);
        assert_eq!(reports.load(Ordering::SeqCst), 1);

        broadcaster.publish(2);
        assert_eq!(reports.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn try_publish_rejects_absent_value() {
        let (broadcaster, reports) = counting();
        assert_eq!(
            broadcaster.try_publish(None),
            Err(BroadcastError::InvalidArgument("published value must not be absent"))
        );
        // Rejection happens before the misuse check.
        assert_eq!(reports.load(Ordering::SeqCst), 0);

        let (_sub, recorder) = broadcaster.subscribe_recording();
        assert!(broadcaster.try_publish(None).is_err());
        assert!(recorder.is_empty());

        assert_eq!(broadcaster.try_publish(Some(5)), Ok(()));
        assert_eq!(recorder.values(), vec![5]);
    }

    #[test]
    fn removing_last_restores_canonical_empty() {
        let (broadcaster, _) = counting();
        let first = broadcaster.subscribe_fn(|_| {});
        let second = broadcaster.subscribe_fn(|_| {});

        first.cancel();
        second.cancel();

        let current = broadcaster.shared.subscriptions.load_full();
        assert!(Arc::ptr_eq(&current, &broadcaster.shared.empty));
    }

    #[test]
    fn remove_preserves_order_of_others() {
        let (broadcaster, _) = counting();
        let subs: Vec<_> = (0..4).map(|_| broadcaster.subscribe_fn(|_| {})).collect();

        subs[1].cancel();

        let ids: Vec<_> = broadcaster
            .shared
            .subscriptions
            .load()
            .iter()
            .map(|e| e.id())
            .collect();
        assert_eq!(ids, vec![subs[0].id(), subs[2].id(), subs[3].id()]);
    }

    #[test]
    fn remove_of_unknown_entry_is_noop() {
        let (broadcaster, _) = counting();
        let (other, _) = counting();
        let stranger = other.subscribe_fn(|_| {});
        broadcaster.subscribe_fn(|_| {});

        broadcaster.shared.remove(stranger.entry());
        assert_eq!(broadcaster.observer_count(), 1);
        assert_eq!(other.observer_count(), 1);
    }

    struct CancelOnStart;

    impl Listener<i32> for CancelOnStart {
        fn on_start(&self, subscription: &Subscription<i32>) {
            subscription.cancel();
        }

        fn on_value(&self, _value: &i32) {
            panic!("cancelled listener must not receive values");
        }
    }

    #[test]
    fn cancel_during_start_leaves_nothing_behind() {
        let (broadcaster, reports) = counting();

        let subscription = broadcaster.subscribe(CancelOnStart);
        assert!(subscription.is_cancelled());
        assert_eq!(broadcaster.observer_count(), 0);

        broadcaster.publish(1);
        assert_eq!(reports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_during_delivery_skips_later_listener() {
        let (broadcaster, _) = counting();
        let slot = Arc::new(parking_lot::Mutex::new(None::<Subscription<i32>>));

        let s = slot.clone();
        broadcaster.subscribe_fn(move |_| {
            if let Some(victim) = s.lock().as_ref() {
                victim.cancel();
            }
        });
        let recorder = RecordingListener::new();
        let victim = broadcaster.subscribe(recorder.clone());
        *slot.lock() = Some(victim.clone());

        broadcaster.publish(1);

        assert!(victim.is_cancelled());
        assert!(recorder.is_empty());
        assert_eq!(broadcaster.observer_count(), 1);
    }

    #[test]
    fn subscribe_during_delivery_is_not_in_current_snapshot() {
        let (broadcaster, _) = counting();
        let late = RecordingListener::new();

        let weak = broadcaster.downgrade();
        let l = late.clone();
        let once = std::sync::Once::new();
        broadcaster.subscribe_fn(move |_| {
            once.call_once(|| {
                if let Some(b) = weak.upgrade() {
                    b.subscribe(l.clone());
                }
            });
        });

        broadcaster.publish(1);
        assert!(late.is_empty());
        assert_eq!(broadcaster.observer_count(), 2);

        broadcaster.publish(2);
        assert_eq!(late.values(), vec![2]);
    }

    #[test]
    fn listener_with_weak_handle_is_freed_with_broadcaster() {
        let (broadcaster, _) = counting();
        let dropped = Arc::new(AtomicBool::new(false));

        let weak = broadcaster.downgrade();
        let flag = DropFlag(dropped.clone());
        // The returned handle is discarded; only the broadcaster owns the entry.
        broadcaster.subscribe_fn(move |v: &i32| {
            let _ = &flag;
            if *v == 0 {
                return;
            }
            if let Some(b) = weak.upgrade() {
                b.publish(v - 1);
            }
        });
        broadcaster.publish(2);
        assert!(!dropped.load(Ordering::SeqCst));

        let handle = broadcaster.downgrade();
        drop(broadcaster);

        assert!(dropped.load(Ordering::SeqCst));
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn weak_handle_upgrades_while_alive() {
        let (broadcaster, _) = counting();
        let weak = broadcaster.downgrade();
        let (_sub, recorder) = broadcaster.subscribe_recording();

        let strong = weak.upgrade().unwrap();
        strong.publish(3);
        assert_eq!(recorder.values(), vec![3]);
        assert_eq!(strong.observer_count(), 1);
        assert!(format!("{weak:?}").contains("alive: true"));
    }

    #[test]
    fn named_broadcaster_reports_name() {
        let broadcaster: Broadcaster<i32> = Broadcaster::named("actions");
        assert_eq!(broadcaster.name(), Some("actions"));
        assert!(format!("{broadcaster:?}").contains("actions"));

        let unnamed: Broadcaster<i32> = Broadcaster::new();
        assert_eq!(unnamed.name(), None);
    }
}
