//! # Dispatcher
//!
//! Serialized, priority-ordered, cancellable event dispatch.
//!
//! Responsibilities:
//! - Keep listeners in descending priority order (FIFO among equals)
//! - Run each listener as its own task, one at a time
//! - Stop propagation when a listener cancels the event
//! - Abort an in-flight fire from outside
//! - Defer disconnects made during a fire until it finishes

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod metrics;

pub use connection::{ConnectOptions, Connection, ConnectionId};
pub use contracts::{Event, Listener, ListenerError, ListenerResult, Priority};
pub use dispatcher::{Dispatcher, DispatcherBuilder, FireReport, FireStatus};
pub use error::{DispatcherError, ListenerLabel};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
