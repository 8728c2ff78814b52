//! Dispatcher - serialized, priority-ordered listener execution

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use contracts::{DispatcherConfig, Event, Listener, ListenerResult, Priority};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, instrument, trace, warn};

use crate::connection::{ConnectOptions, Connection, ConnectionId, Detach};
use crate::error::{DispatcherError, ListenerLabel};
use crate::metrics::DispatcherMetrics;

/// How a fire ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireStatus {
    /// Every connected listener ran
    Completed,
    /// A listener cancelled the event
    EventCancelled,
    /// [`Dispatcher::cancel`] stopped the fire
    Aborted,
}

/// Summary of one successful fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireReport {
    pub status: FireStatus,
    /// Listeners started during this fire
    pub invoked: usize,
    pub elapsed: Duration,
}

/// Builder for creating a Dispatcher
#[derive(Debug, Clone, Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: DispatcherConfig) -> Self {
        Self { config }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn cancellable(mut self, cancellable: bool) -> Self {
        self.config.cancellable = cancellable;
        self
    }

    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(dispatcher = %self.config.name, cancellable = self.config.cancellable)
    )]
    pub fn build<T: Send + Sync + 'static>(self) -> Dispatcher<T> {
        debug!("Dispatcher created");
        Dispatcher {
            shared: Arc::new(Shared {
                name: self.config.name,
                cancellable: self.config.cancellable,
                state: Mutex::new(State::default()),
                next_id: AtomicU64::new(1),
                metrics: DispatcherMetrics::new(),
            }),
        }
    }
}

/// One registered listener as stored by the dispatcher
struct Slot<T> {
    id: ConnectionId,
    priority: Priority,
    once: bool,
    name: Option<Arc<str>>,
    connected: Arc<AtomicBool>,
    listener: Arc<dyn Listener<T>>,
}

impl<T> Slot<T> {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn label(&self) -> ListenerLabel {
        ListenerLabel {
            id: self.id,
            name: self.name.as_deref().map(str::to_string),
            priority: self.priority,
        }
    }
}

/// The listener task a fire is currently waiting on
struct RunningListener {
    task_id: tokio::task::Id,
    abort: AbortHandle,
    /// Wakes the firing caller with a cancellation signal
    resume_tx: Option<oneshot::Sender<()>>,
}

struct State<T> {
    /// Descending priority, FIFO among equals
    slots: Vec<Arc<Slot<T>>>,
    firing: bool,
    pending_removal: bool,
    abort_requested: bool,
    destroyed: bool,
    running: Option<RunningListener>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            firing: false,
            pending_removal: false,
            abort_requested: false,
            destroyed: false,
            running: None,
        }
    }
}

impl<T> State<T> {
    /// Sweep slots disconnected while firing
    fn purge(&mut self) {
        if self.pending_removal {
            self.slots.retain(|slot| slot.is_connected());
            self.pending_removal = false;
        }
    }
}

struct Shared<T> {
    name: String,
    cancellable: bool,
    state: Mutex<State<T>>,
    next_id: AtomicU64,
    metrics: DispatcherMetrics,
}

impl<T: Send + Sync + 'static> Detach for Shared<T> {
    fn detach(&self, id: ConnectionId) {
        let mut state = self.state.lock();
        if state.firing {
            state.pending_removal = true;
        } else {
            state.slots.retain(|slot| slot.id != id);
        }
    }
}

/// Holds the single-flight slot for the duration of one fire
///
/// Dropping the guard (including when the fire future itself is dropped)
/// aborts any listener still running, sweeps deferred removals and frees
/// the dispatcher for the next fire.
struct FireGuard<'a, T> {
    shared: &'a Shared<T>,
}

impl<'a, T> FireGuard<'a, T> {
    fn acquire(shared: &'a Shared<T>) -> Result<Self, DispatcherError> {
        let mut state = shared.state.lock();
        if state.destroyed {
            return Err(DispatcherError::Destroyed {
                dispatcher: shared.name.clone(),
            });
        }
        if state.firing {
            return Err(DispatcherError::AlreadyFiring {
                dispatcher: shared.name.clone(),
            });
        }
        state.firing = true;
        state.abort_requested = false;
        Ok(Self { shared })
    }
}

impl<T> Drop for FireGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if let Some(running) = state.running.take() {
            running.abort.abort();
        }
        state.purge();
        state.firing = false;
        state.abort_requested = false;
    }
}

enum Step<T> {
    Started {
        slot: Arc<Slot<T>>,
        task: JoinHandle<ListenerResult>,
        resume_rx: oneshot::Receiver<()>,
    },
    Exhausted,
    Aborted,
}

/// Priority-ordered, single-flight event dispatcher
///
/// Cloning yields another handle to the same dispatcher. Listeners run one
/// at a time, each inside its own tokio task, so a listener may suspend
/// without letting the next one start early. Firing requires a tokio
/// runtime.
///
/// A listener that captures a handle to its own dispatcher forms a
/// reference cycle; [`Dispatcher::destroy`] breaks it.
pub struct Dispatcher<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Dispatcher<T> {
    /// Create a cancellable dispatcher with the default name
    pub fn new() -> Self {
        DispatcherBuilder::new().build()
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        DispatcherBuilder::from_config(config).build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_cancellable(&self) -> bool {
        self.shared.cancellable
    }

    pub fn is_firing(&self) -> bool {
        self.shared.state.lock().firing
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    /// Number of listeners still connected
    pub fn connection_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.is_connected())
            .count()
    }

    pub fn metrics(&self) -> &DispatcherMetrics {
        &self.shared.metrics
    }

    /// Register a listener
    ///
    /// # Errors
    /// - [`DispatcherError::ConnectWhileFiring`] during a fire
    /// - [`DispatcherError::InvalidPriority`] for NaN
    /// - [`DispatcherError::Destroyed`] after [`Dispatcher::destroy`]
    pub fn connect<F, Fut>(
        &self,
        callback: F,
        priority: impl Into<Priority>,
    ) -> Result<Connection, DispatcherError>
    where
        F: Fn(Event<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        self.connect_with(ConnectOptions::new(priority), callback)
    }

    /// Register a listener that disconnects right before its first invocation
    pub fn once<F, Fut>(
        &self,
        callback: F,
        priority: impl Into<Priority>,
    ) -> Result<Connection, DispatcherError>
    where
        F: Fn(Event<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        self.connect_with(ConnectOptions::new(priority).once(), callback)
    }

    /// Register any [`Listener`] with explicit options
    pub fn connect_with<L: Listener<T>>(
        &self,
        options: ConnectOptions,
        listener: L,
    ) -> Result<Connection, DispatcherError> {
        let priority = options.priority;
        if !priority.is_valid() {
            return Err(self.reject(DispatcherError::InvalidPriority {
                priority: priority.value(),
            }));
        }

        let mut state = self.shared.state.lock();
        if state.destroyed {
            drop(state);
            return Err(self.reject(DispatcherError::Destroyed {
                dispatcher: self.shared.name.clone(),
            }));
        }
        if state.firing {
            drop(state);
            return Err(self.reject(DispatcherError::ConnectWhileFiring {
                dispatcher: self.shared.name.clone(),
            }));
        }

        let id = ConnectionId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let name: Option<Arc<str>> = options.name.map(Arc::from);
        let connected = Arc::new(AtomicBool::new(true));
        let slot = Arc::new(Slot {
            id,
            priority,
            once: options.once,
            name: name.clone(),
            connected: Arc::clone(&connected),
            listener: Arc::new(listener),
        });

        // Before the first strictly lower priority keeps equal priorities FIFO
        let index = state
            .slots
            .iter()
            .position(|existing| existing.priority < priority)
            .unwrap_or(state.slots.len());
        state.slots.insert(index, slot);
        drop(state);

        debug!(
            dispatcher = %self.shared.name,
            connection = %id,
            priority = %priority,
            once = options.once,
            "Listener connected"
        );

        let owner = Arc::downgrade(&self.shared);
        let owner: Weak<dyn Detach> = owner;
        Ok(Connection::new(id, priority, name, connected, owner))
    }

    /// Deliver `value` to every connected listener in priority order
    ///
    /// Returns once the last listener finishes, a listener cancels the
    /// event, or [`Dispatcher::cancel`] aborts the fire. Both kinds of
    /// cancellation are reported through [`FireReport::status`], not as
    /// errors.
    ///
    /// # Errors
    /// - [`DispatcherError::AlreadyFiring`] if another fire is in progress;
    ///   no listener runs
    /// - [`DispatcherError::ListenerFailed`] / [`DispatcherError::ListenerPanicked`];
    ///   later listeners do not run
    ///
    /// # Panics
    /// Outside a tokio runtime.
    #[instrument(name = "dispatcher_fire", skip(self, value), fields(dispatcher = %self.shared.name))]
    pub async fn fire(&self, value: T) -> Result<FireReport, DispatcherError> {
        let started = Instant::now();
        let _guard = FireGuard::acquire(&self.shared).map_err(|e| self.reject(e))?;
        self.shared.metrics.inc_fires_started();

        let event = Event::new(value, self.shared.cancellable);
        let mut invoked = 0;
        let outcome = self.run_listeners(&event, &mut invoked).await;

        let metrics = &self.shared.metrics;
        match &outcome {
            Ok(FireStatus::Completed) => metrics.inc_fires_completed(),
            Ok(FireStatus::EventCancelled) => metrics.inc_fires_event_cancelled(),
            Ok(FireStatus::Aborted) => metrics.inc_fires_aborted(),
            Err(_) => metrics.inc_fires_failed(),
        }

        outcome.map(|status| FireReport {
            status,
            invoked,
            elapsed: started.elapsed(),
        })
    }

    /// Abort the fire in progress from outside its listeners
    ///
    /// The running listener task is aborted on a best-effort basis; the
    /// firing caller is resumed regardless and returns
    /// [`FireStatus::Aborted`]. Returns `false` when nothing is firing.
    ///
    /// # Errors
    /// [`DispatcherError::CancelFromListener`] when called from the
    /// dispatcher's own running listener.
    pub fn cancel(&self) -> Result<bool, DispatcherError> {
        let mut state = self.shared.state.lock();
        if !state.firing {
            return Ok(false);
        }

        let current_task = tokio::task::try_id();
        let from_listener = state
            .running
            .as_ref()
            .is_some_and(|running| current_task == Some(running.task_id));
        if from_listener {
            drop(state);
            return Err(self.reject(DispatcherError::CancelFromListener {
                dispatcher: self.shared.name.clone(),
            }));
        }

        if let Some(running) = state.running.as_mut() {
            running.abort.abort();
            if let Some(resume_tx) = running.resume_tx.take() {
                // Receiver is gone only if the fire already moved on
                let _ = resume_tx.send(());
            }
        }
        state.abort_requested = true;
        drop(state);

        warn!(dispatcher = %self.shared.name, "Fire cancelled externally");
        Ok(true)
    }

    /// Cancel any fire in progress and disconnect every listener
    ///
    /// Later `connect`/`fire` calls fail with [`DispatcherError::Destroyed`].
    #[instrument(name = "dispatcher_destroy", skip(self), fields(dispatcher = %self.shared.name))]
    pub fn destroy(&self) -> Result<(), DispatcherError> {
        self.cancel()?;

        let mut state = self.shared.state.lock();
        state.destroyed = true;
        for slot in &state.slots {
            slot.connected.store(false, Ordering::Release);
        }
        let connections = state.slots.len();
        if state.firing {
            state.pending_removal = true;
        } else {
            state.slots.clear();
        }
        drop(state);

        info!(connections, "Dispatcher destroyed");
        Ok(())
    }

    async fn run_listeners(
        &self,
        event: &Event<T>,
        invoked: &mut usize,
    ) -> Result<FireStatus, DispatcherError> {
        let mut index = 0;
        loop {
            let (slot, mut task, mut resume_rx) = match self.start_next(event, &mut index) {
                Step::Started {
                    slot,
                    task,
                    resume_rx,
                } => (slot, task, resume_rx),
                Step::Exhausted => return Ok(FireStatus::Completed),
                Step::Aborted => return Ok(FireStatus::Aborted),
            };
            *invoked += 1;
            self.shared.metrics.inc_listener_invocations();
            trace!(connection = %slot.id, priority = %slot.priority, "Listener started");

            let joined = tokio::select! {
                biased;
                Ok(()) = &mut resume_rx => None,
                joined = &mut task => Some(joined),
            };
            self.shared.state.lock().running = None;

            let Some(joined) = joined else {
                warn!(connection = %slot.id, "Fire aborted while listener was running");
                return Ok(FireStatus::Aborted);
            };

            match joined {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    warn!(connection = %slot.id, error = %source, "Listener failed");
                    return Err(DispatcherError::ListenerFailed {
                        dispatcher: self.shared.name.clone(),
                        listener: slot.label(),
                        source,
                    });
                }
                Err(err) if err.is_cancelled() => return Ok(FireStatus::Aborted),
                Err(err) => {
                    let message = panic_message(err.into_panic());
                    warn!(connection = %slot.id, panic = %message, "Listener panicked");
                    return Err(DispatcherError::ListenerPanicked {
                        dispatcher: self.shared.name.clone(),
                        listener: slot.label(),
                        message,
                    });
                }
            }

            if event.is_cancelled() {
                debug!(connection = %slot.id, "Event cancelled, skipping remaining listeners");
                return Ok(FireStatus::EventCancelled);
            }
        }
    }

    /// Spawn the next connected listener, recording it as running
    fn start_next(&self, event: &Event<T>, index: &mut usize) -> Step<T> {
        let mut state = self.shared.state.lock();
        loop {
            let Some(slot) = state.slots.get(*index).cloned() else {
                return Step::Exhausted;
            };
            *index += 1;

            if !slot.is_connected() {
                continue;
            }
            // Only an abort that leaves a listener unrun counts
            if state.abort_requested {
                return Step::Aborted;
            }
            if slot.once {
                if !slot.connected.swap(false, Ordering::AcqRel) {
                    continue;
                }
                state.pending_removal = true;
            }

            let listener = Arc::clone(&slot.listener);
            let event = event.clone();
            // The callback itself runs inside the task, never under this lock
            let task = tokio::spawn(async move { listener.on_event(event).await });
            let (resume_tx, resume_rx) = oneshot::channel();
            state.running = Some(RunningListener {
                task_id: task.id(),
                abort: task.abort_handle(),
                resume_tx: Some(resume_tx),
            });
            return Step::Started {
                slot,
                task,
                resume_rx,
            };
        }
    }

    fn reject(&self, err: DispatcherError) -> DispatcherError {
        self.shared.metrics.inc_usage_rejections();
        debug!(dispatcher = %self.shared.name, error = %err, "Dispatcher call rejected");
        err
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Dispatcher")
            .field("name", &self.shared.name)
            .field("cancellable", &self.shared.cancellable)
            .field("slots", &state.slots.len())
            .field("firing", &state.firing)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
