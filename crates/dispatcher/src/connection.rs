//! Connection - handle to one registered listener

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use contracts::Priority;
use tracing::debug;

/// Identifier of a connection, unique within its dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options for [`Dispatcher::connect_with`](crate::Dispatcher::connect_with)
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Ordering priority, higher runs first
    pub priority: Priority,
    /// Disconnect right before the first invocation
    pub once: bool,
    /// Name reported in logs and listener errors
    pub name: Option<String>,
}

impl ConnectOptions {
    pub fn new(priority: impl Into<Priority>) -> Self {
        Self {
            priority: priority.into(),
            ..Self::default()
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Removal hook implemented by the dispatcher's shared state
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: ConnectionId);
}

/// Handle to a registered listener
///
/// Holds only a weak reference to its dispatcher. Dropping the handle does
/// not disconnect the listener; call [`Connection::disconnect`].
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    priority: Priority,
    name: Option<Arc<str>>,
    connected: Arc<AtomicBool>,
    owner: Weak<dyn Detach>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        priority: Priority,
        name: Option<Arc<str>>,
        connected: Arc<AtomicBool>,
        owner: Weak<dyn Detach>,
    ) -> Self {
        Self {
            id,
            priority,
            name,
            connected,
            owner,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Disconnect the listener
    ///
    /// Idempotent. Removal is immediate when the dispatcher is idle and
    /// deferred to the end of the current fire otherwise. Returns `true`
    /// only for the call that disconnected.
    pub fn disconnect(&self) -> bool {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return false;
        }
        debug!(connection = %self.id, "Connection disconnected");
        if let Some(owner) = self.owner.upgrade() {
            owner.detach(self.id);
        }
        true
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
