//! Event - the value wrapper delivered to listeners on one firing

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One firing's payload as seen by listeners
///
/// Cloning is cheap: every clone observes the same cancellation flag.
/// The only mutation an event supports is the `cancelled` transition
/// false -> true, and only when the event is cancellable.
pub struct Event<T> {
    inner: Arc<EventInner<T>>,
}

struct EventInner<T> {
    value: T,
    cancellable: bool,
    cancelled: AtomicBool,
}

impl<T> Event<T> {
    /// Create a fresh, uncancelled event
    pub fn new(value: T, cancellable: bool) -> Self {
        Self {
            inner: Arc::new(EventInner {
                value,
                cancellable,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// The fired value
    pub fn value(&self) -> &T {
        &self.inner.value
    }

    /// Whether listeners may stop propagation
    pub fn is_cancellable(&self) -> bool {
        self.inner.cancellable
    }

    /// Whether propagation has been stopped
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Stop propagation to lower-priority listeners
    ///
    /// Returns `true` only for the call that performed the transition.
    /// No-op on a non-cancellable event.
    pub fn cancel(&self) -> bool {
        if !self.inner.cancellable {
            return false;
        }
        !self.inner.cancelled.swap(true, Ordering::AcqRel)
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("value", &self.inner.value)
            .field("cancellable", &self.inner.cancellable)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
