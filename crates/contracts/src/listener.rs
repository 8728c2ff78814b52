//! Listener - the callback contract consumed by the dispatcher

use std::future::Future;
use std::pin::Pin;

use crate::Event;

/// Error raised by a listener; any `std::error::Error` converts with `?`
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one listener invocation
pub type ListenerResult = Result<(), ListenerError>;

/// Boxed listener future, scheduled as its own task by the dispatcher
pub type ListenerFuture = Pin<Box<dyn Future<Output = ListenerResult> + Send + 'static>>;

/// Event listener
///
/// Each invocation returns a future that the dispatcher runs as an
/// independently suspendable unit. The future may await freely; the
/// dispatcher will not start the next listener until it resolves.
///
/// Implemented for every `Fn(Event<T>) -> impl Future<Output = ListenerResult>`.
pub trait Listener<T>: Send + Sync + 'static {
    /// Handle one event
    fn on_event(&self, event: Event<T>) -> ListenerFuture;
}

impl<T, F, Fut> Listener<T> for F
where
    F: Fn(Event<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListenerResult> + Send + 'static,
{
    fn on_event(&self, event: Event<T>) -> ListenerFuture {
        Box::pin(self(event))
    }
}
