//! Listener types for the broadcast system.
//!
//! A Listener is anything that wants values from a broadcaster. It is told
//! once that its subscription started and then receives every published value
//! by reference, on the publisher's thread.

use std::sync::Arc;

use parking_lot::Mutex;

use super::subscription::Subscription;

/// Receiver of broadcast values.
///
/// Both callbacks run synchronously on the calling thread. They may call back
/// into the broadcaster (subscribe, cancel, publish) without deadlocking.
///
/// The broadcaster owns its listeners, so a listener that calls back into it
/// must capture [`Broadcaster::downgrade`](super::Broadcaster::downgrade) and
/// upgrade on use. Capturing a `Broadcaster` clone forms a reference cycle and
/// neither side is ever freed.
///
/// ```rust,ignore
/// let weak = actions.downgrade();
/// actions.subscribe_fn(move |depth: &u32| {
///     if *depth > 0 {
///         if let Some(actions) = weak.upgrade() {
///             actions.publish(depth - 1);
///         }
///     }
/// });
/// ```
pub trait Listener<T>: Send + Sync {
    /// Acknowledge the start of the subscription.
    ///
    /// Called once, before the subscription is installed. Cancelling
    /// `subscription` from here is allowed; the broadcaster then drops the
    /// registration right away.
    fn on_start(&self, subscription: &Subscription<T>) {
        let _ = subscription;
    }

    /// Receive one published value.
    fn on_value(&self, value: &T);
}

impl<T, L> Listener<T> for Arc<L>
where
    L: Listener<T> + ?Sized,
{
    fn on_start(&self, subscription: &Subscription<T>) {
        (**self).on_start(subscription);
    }

    fn on_value(&self, value: &T) {
        (**self).on_value(value);
    }
}

/// Adapter turning a closure into a [`Listener`].
pub(crate) struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F> Listener<T> for FnListener<F>
where
    F: Fn(&T) + Send + Sync,
{
    fn on_value(&self, value: &T) {
        (self.f)(value);
    }
}

/// A listener that remembers everything it was given.
///
/// Clones share the same recording, so keep one clone and hand the other to
/// [`Broadcaster::subscribe`](super::Broadcaster::subscribe). Mostly useful in
/// tests.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingListener::new();
/// broadcaster.subscribe(recorder.clone());
/// broadcaster.publish(1);
/// assert_eq!(recorder.values(), vec![1]);
/// ```
pub struct RecordingListener<T> {
    inner: Arc<Recording<T>>,
}

struct Recording<T> {
    starts: Mutex<usize>,
    values: Mutex<Vec<T>>,
}

impl<T> RecordingListener<T>
where
    T: Clone + Send + Sync,
{
    /// Create an empty recording.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Recording {
                starts: Mutex::new(0),
                values: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Values received so far, in delivery order.
    pub fn values(&self) -> Vec<T> {
        self.inner.values.lock().clone()
    }

    /// Number of values received so far.
    pub fn len(&self) -> usize {
        self.inner.values.lock().len()
    }

    /// True if no value has been received.
    pub fn is_empty(&self) -> bool {
        self.inner.values.lock().is_empty()
    }

    /// Number of start acknowledgements received.
    pub fn start_count(&self) -> usize {
        *self.inner.starts.lock()
    }

    /// Forget recorded values.
    pub fn clear(&self) {
        self.inner.values.lock().clear();
    }
}

impl<T> Default for RecordingListener<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordingListener<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Listener<T> for RecordingListener<T>
where
    T: Clone + Send + Sync,
{
    fn on_start(&self, _subscription: &Subscription<T>) {
        *self.inner.starts.lock() += 1;
    }

    fn on_value(&self, value: &T) {
        self.inner.values.lock().push(value.clone());
    }
}
