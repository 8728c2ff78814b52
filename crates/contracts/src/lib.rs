//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Listener Model
//! - A listener receives one [`Event`] per firing and returns a boxed future
//! - Listeners are ordered by [`Priority`] (descending, FIFO among equals)
//! - The payload type is opaque to the dispatcher

mod dispatcher_config;
mod error;
mod event;
mod listener;
mod priority;
mod scenario;

pub use dispatcher_config::*;
pub use error::*;
pub use event::Event;
pub use listener::{Listener, ListenerError, ListenerFuture, ListenerResult};
pub use priority::Priority;
pub use scenario::*;
