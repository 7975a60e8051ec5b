//! Async adapter.
//!
//! [`ListenerStream`] bridges the synchronous broadcaster into async code.
//! Each published value is cloned into an unbounded tokio channel and handed
//! out through [`futures_util::Stream`].
//!
//! The stream ends once the registration is gone: after
//! [`ListenerStream::cancel`], or when the broadcaster is dropped. Values that
//! were already queued are still yielded first.

use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use super::broadcaster::Broadcaster;
use super::listener::Listener;
use super::subscription::Entry;

/// Listener forwarding clones of every value into a channel.
struct ChannelListener<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Listener<T> for ChannelListener<T>
where
    T: Clone + Send + Sync,
{
    fn on_value(&self, value: &T) {
        if self.tx.send(value.clone()).is_err() {
            tracing::trace!("stream receiver dropped, value discarded");
        }
    }
}

/// An async stream of the values published after subscribing.
///
/// Dropping the stream cancels its subscription.
pub struct ListenerStream<T>
where
    T: Send + Sync + 'static,
{
    rx: mpsc::UnboundedReceiver<T>,

    /// Weak so that removal from the broadcaster drops the sender and ends
    /// the stream.
    entry: Weak<Entry<T>>,
}

impl<T> ListenerStream<T>
where
    T: Send + Sync + 'static,
{
    /// Wait for the next value. Returns `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next value if one is already queued.
    ///
    /// Fails with [`TryRecvError::Empty`] while the subscription is live but
    /// nothing is queued, and with [`TryRecvError::Disconnected`] once the
    /// stream has ended and every queued value was taken.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }

    /// Cancel the underlying subscription. Queued values remain readable.
    pub fn cancel(&self) {
        if let Some(entry) = self.entry.upgrade() {
            entry.cancel();
        }
    }

    /// True once the subscription is cancelled or no longer exists.
    pub fn is_cancelled(&self) -> bool {
        self.entry
            .upgrade()
            .map_or(true, |entry| entry.is_cancelled())
    }
}

impl<T> Stream for ListenerStream<T>
where
    T: Send + Sync + 'static,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for ListenerStream<T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> Broadcaster<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Subscribe and receive values as an async [`Stream`].
    pub fn subscribe_stream(&self) -> ListenerStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(ChannelListener { tx });
        ListenerStream {
            rx,
            entry: subscription.downgrade(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NoopReporter;
    use futures_util::StreamExt;
    use std::sync::Arc;

    fn quiet() -> Broadcaster<u32> {
        Broadcaster::with_reporter(Arc::new(NoopReporter))
    }

    #[tokio::test]
    async fn stream_yields_published_values() {
        let broadcaster = quiet();
        let mut stream = broadcaster.subscribe_stream();

        broadcaster.publish(1);
        broadcaster.publish(2);

        assert_eq!(stream.recv().await, Some(1));
        assert_eq!(stream.next().await, Some(2));
        assert_eq!(stream.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn try_recv_tells_empty_from_ended() {
        let broadcaster = quiet();
        let mut stream = broadcaster.subscribe_stream();
        assert_eq!(stream.try_recv(), Err(TryRecvError::Empty));

        broadcaster.publish(4);
        stream.cancel();

        assert_eq!(stream.try_recv(), Ok(4));
        assert_eq!(stream.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[tokio::test]
    async fn cancel_ends_stream_after_queued_values() {
        let broadcaster = quiet();
        let mut stream = broadcaster.subscribe_stream();

        broadcaster.publish(7);
        stream.cancel();
        assert!(stream.is_cancelled());
        assert_eq!(broadcaster.observer_count(), 0);

        broadcaster.publish(8);
        assert_eq!(stream.recv().await, Some(7));
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn dropping_broadcaster_ends_stream() {
        let broadcaster = quiet();
        let mut stream = broadcaster.subscribe_stream();
        drop(broadcaster);

        assert_eq!(stream.recv().await, None);
        assert!(stream.is_cancelled());
    }

    #[test]
    fn dropping_stream_cancels_subscription() {
        let broadcaster = quiet();
        let stream = broadcaster.subscribe_stream();
        assert_eq!(broadcaster.observer_count(), 1);

        drop(stream);
        assert_eq!(broadcaster.observer_count(), 0);
    }
}
