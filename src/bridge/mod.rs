// Event bridge - carries dialog events from the dialog worker thread to the host thread
//
// The bridge is the queue + lock + wake primitive triple. Producers (dialog threads)
// only ever append under a short exclusive lock and then signal. The consumer (the
// host's cooperative thread) swaps the queue out, releases the lock and dispatches the
// snapshot, so a callback that raises another event never contends with its own drain.

pub mod event;
pub mod host;
pub mod payload;
pub mod signal;

pub use event::{DialogId, Event, EventName};
pub use host::{HostLoop, run_blocking};
pub use payload::{HostValue, Payload};
pub use signal::BridgeSignal;

use crate::metrics::BridgeMetrics;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

/// Receives drained events on the host thread, once per event, in enqueue order.
///
/// Implemented for any `Fn(EventName, HostValue)` closure. Sinks may enqueue new
/// events or touch dialogs while being called; they must not panic.
#[cfg_attr(test, mockall::automock)]
pub trait CallbackSink {
    fn on_event(&self, name: EventName, value: HostValue);
}

impl<F> CallbackSink for F
where
    F: Fn(EventName, HostValue),
{
    fn on_event(&self, name: EventName, value: HostValue) {
        self(name, value)
    }
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by both threads: the queue, the current wake primitive and counters
#[derive(Debug, Default)]
struct Shared {
    queue: RwLock<VecDeque<Event>>,
    wake: RwLock<Option<BridgeSignal>>,
    metrics: BridgeMetrics,
}

/// Producer half of the bridge. Cheap to clone, `Send + Sync`.
///
/// Handed to the dialog worker thread; everything it enqueues ends up at the
/// host-side [`EventBridge`] it came from.
#[derive(Debug, Clone)]
pub struct BridgeProducer {
    shared: Arc<Shared>,
}

impl BridgeProducer {
    /// Append an event and wake the consumer.
    ///
    /// Takes the queue lock only for the append and never waits for a drain. If no
    /// session is open the event stays queued and is delivered by the next drain.
    pub fn enqueue(&self, event: Event) {
        self.shared.metrics.record_enqueue();
        tracing::trace!(dialog = %event.dialog, event = %event.name, "Enqueueing dialog event");

        write_lock(&self.shared.queue).push_back(event);

        let wake = read_lock(&self.shared.wake).clone();
        match wake {
            Some(signal) => {
                signal.signal();
                self.shared.metrics.record_wake();
            }
            None => {
                self.shared.metrics.record_late_enqueue();
                tracing::debug!("Event enqueued with no open session - held for the next drain");
            }
        }
    }
}

/// Host-side half of the bridge.
///
/// Owns the sink registry and the reference-counted wake primitive. Lives on the
/// host thread (`!Send`); create one per [`HostLoop`].
pub struct EventBridge {
    shared: Arc<Shared>,
    sinks: RefCell<HashMap<DialogId, Rc<dyn CallbackSink>>>,
    sessions: Cell<usize>,
    dispatcher: RefCell<Option<JoinHandle<()>>>,
}

impl EventBridge {
    /// Set up an empty queue and its lock. No wake primitive exists until the first
    /// session is acquired.
    pub fn initialize() -> Rc<Self> {
        tracing::debug!("Event bridge initialized");
        Rc::new(Self {
            shared: Arc::new(Shared::default()),
            sinks: RefCell::new(HashMap::new()),
            sessions: Cell::new(0),
            dispatcher: RefCell::new(None),
        })
    }

    pub fn producer(&self) -> BridgeProducer {
        BridgeProducer {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.shared.metrics
    }

    pub fn same_as(&self, other: &EventBridge) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Route events for `dialog` to `sink`
    pub fn register(&self, dialog: DialogId, sink: Rc<dyn CallbackSink>) {
        self.sinks.borrow_mut().insert(dialog, sink);
    }

    pub fn unregister(&self, dialog: DialogId) {
        self.sinks.borrow_mut().remove(&dialog);
    }

    pub fn is_registered(&self, dialog: DialogId) -> bool {
        self.sinks.borrow().contains_key(&dialog)
    }

    /// Number of events waiting in the queue
    pub fn pending(&self) -> usize {
        read_lock(&self.shared.queue).len()
    }

    /// Number of open modal sessions
    pub fn session_count(&self) -> usize {
        self.sessions.get()
    }

    /// The live wake primitive, if a session is open
    pub fn current_signal(&self) -> Option<BridgeSignal> {
        read_lock(&self.shared.wake).clone()
    }

    /// Open a modal session.
    ///
    /// The first session creates the wake primitive and spawns the local dispatcher
    /// task that drains the queue each time it is woken; it must therefore be called
    /// from inside the host's `LocalSet`. Dropping the last guard tears both down.
    pub fn acquire_session(self: &Rc<Self>) -> SessionGuard {
        let previous = self.sessions.get();
        self.sessions.set(previous + 1);
        self.shared.metrics.record_session();

        if previous == 0 {
            let signal = BridgeSignal::new();
            *write_lock(&self.shared.wake) = Some(signal.clone());

            let bridge = Rc::downgrade(self);
            let waiter = signal.clone();
            let handle = tokio::task::spawn_local(async move {
                tracing::debug!("Bridge dispatcher started");
                loop {
                    waiter.notified().await;
                    let Some(bridge) = bridge.upgrade() else {
                        break;
                    };
                    bridge.drain_and_dispatch();
                }
                tracing::debug!("Bridge dispatcher stopped");
            });
            *self.dispatcher.borrow_mut() = Some(handle);

            // Events raised while no session was open still need a drain
            if self.pending() > 0 {
                signal.signal();
            }
            tracing::debug!("Wake primitive created for first session");
        } else {
            tracing::debug!(sessions = previous + 1, "Session shares the existing wake primitive");
        }

        SessionGuard {
            bridge: Rc::clone(self),
        }
    }

    fn release_session(&self) {
        let remaining = self.sessions.get().saturating_sub(1);
        self.sessions.set(remaining);

        if remaining == 0 {
            write_lock(&self.shared.wake).take();
            if let Some(handle) = self.dispatcher.borrow_mut().take() {
                handle.abort();
            }
            tracing::debug!("Last session closed - wake primitive torn down");
        }
    }

    /// Drain the queue and dispatch every event to its sink, in FIFO order.
    ///
    /// The queue is swapped for an empty one under a short exclusive lock; sinks run
    /// after the lock is released. Events enqueued by a sink land in the fresh queue and
    /// are picked up by a later drain. Returns the number of events delivered.
    pub fn drain_and_dispatch(&self) -> usize {
        let batch = std::mem::take(&mut *write_lock(&self.shared.queue));
        if batch.is_empty() {
            return 0;
        }

        self.shared.metrics.record_drain();
        tracing::trace!(count = batch.len(), "Drained event queue");

        let mut delivered = 0;
        for Event {
            dialog,
            name,
            payload,
        } in batch
        {
            let sink = self.sinks.borrow().get(&dialog).cloned();
            match sink {
                Some(sink) => {
                    tracing::debug!(%dialog, event = %name, "Dispatching dialog event");
                    sink.on_event(name, payload.materialize());
                    self.shared.metrics.record_dispatch();
                    delivered += 1;
                }
                None => {
                    tracing::warn!(%dialog, event = %name, "No sink registered - dropping event");
                    self.shared.metrics.record_undeliverable();
                }
            }
        }

        delivered
    }
}

/// Keeps one modal session open on an [`EventBridge`].
///
/// Dropping the guard closes the session; the last one tears down the wake primitive.
pub struct SessionGuard {
    bridge: Rc<EventBridge>,
}

impl SessionGuard {
    pub fn bridge(&self) -> &Rc<EventBridge> {
        &self.bridge
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.bridge.release_session();
    }
}
