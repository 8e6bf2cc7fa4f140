//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus distributes state-change messages to every live subscriber.
//!
//! ## Delivery
//!
//! - **Once per publish** to every subscriber alive at publish time.
//! - **Ordered per publisher**: messages arrive in the order one caller
//!   published them.
//! - **No persistence**: the bus carries notifications, the publisher's own
//!   state remains the source of truth.
//!
//! ## Teardown
//!
//! A [`Subscription`] unsubscribes itself when dropped. The bus notices the
//! closed channel on its next publish and forgets the subscriber, so views
//! that go away do not leak senders.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to a message stream.
///
/// ## Usage Pattern
///
/// ```ignore
/// let roles = session.subscribe();
///
/// // Current value is delivered immediately.
/// let current = roles.try_recv()?;
///
/// // Later, after a login/logout elsewhere:
/// while let Ok(next) = roles.try_recv() {
///     render_menu(&next);
/// }
/// ```
///
/// Subscriptions are meant for one consumer. Dropping the value is the
/// unsubscribe operation.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything queued so far and return the most recent message.
    ///
    /// Views that only care about the current state (not every transition)
    /// use this to skip intermediate values.
    pub fn latest(&self) -> Option<M> {
        let mut last = None;
        while let Ok(message) = self.receiver.try_recv() {
            last = Some(message);
        }
        last
    }

    /// Explicitly end the subscription. Equivalent to dropping it.
    pub fn unsubscribe(self) {}
}

/// Transport-agnostic pub/sub contract.
///
/// `publish()` may fail (e.g. lock poisoning); failures are surfaced to the
/// caller, which decides whether a missed notification matters.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;

    /// Number of subscribers still attached (as of the last publish).
    fn subscriber_count(&self) -> usize;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn subscriber_count(&self) -> usize {
        (**self).subscriber_count()
    }
}
