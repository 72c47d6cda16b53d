// src/notify.rs

//! Event notification hub.
//!
//! [`Notifier`] is a typed handler registry: callers register plain
//! callbacks with [`on`](Notifier::on) or [`once`](Notifier::once) and the
//! owner publishes events with [`emit`](Notifier::emit). Handlers run in
//! registration order on the emitting thread; a failing handler is reported
//! via `tracing` and never stops the remaining handlers.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::warn;

type Handler<E> = Arc<dyn Fn(&E) -> Result<()> + Send + Sync>;

/// Handle returned by [`Notifier::on`] / [`Notifier::once`], used to
/// deregister a handler with [`Notifier::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct HandlerEntry<E> {
    id: HandlerId,
    handler: Handler<E>,
    once: bool,
}

/// Ordered registry of event handlers for events of type `E`.
pub struct Notifier<E> {
    state: Mutex<NotifierState<E>>,
}

struct NotifierState<E> {
    handlers: Vec<HandlerEntry<E>>,
    next_id: u64,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Notifier<E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NotifierState {
                handlers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Register a handler for every future emission.
    pub fn on<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(handler), false)
    }

    /// Register a handler that is removed before its first invocation.
    pub fn once<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(handler), true)
    }

    /// Deregister a handler. No-op if the id is unknown (e.g. a `once`
    /// handler that has already fired).
    pub fn off(&self, id: HandlerId) {
        self.state.lock().handlers.retain(|entry| entry.id != id);
    }

    /// Deregister all handlers.
    pub fn clear(&self) {
        self.state.lock().handlers.clear();
    }

    /// Number of currently registered handlers.
    pub fn len(&self) -> usize {
        self.state.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().handlers.is_empty()
    }

    /// Invoke every registered handler with the event, in registration
    /// order. `once` handlers are removed before invocation, so a handler
    /// re-registering itself during emission is safe.
    pub fn emit(&self, event: &E) {
        // Snapshot under the lock, invoke outside it, so handlers may call
        // back into this notifier.
        let snapshot: Vec<Handler<E>> = {
            let mut state = self.state.lock();
            let snapshot = state
                .handlers
                .iter()
                .map(|entry| Arc::clone(&entry.handler))
                .collect();
            state.handlers.retain(|entry| !entry.once);
            snapshot
        };

        for handler in snapshot {
            if let Err(err) = (*handler)(event) {
                warn!(error = %err, "event handler failed");
            }
        }
    }

    fn register(&self, handler: Handler<E>, once: bool) -> HandlerId {
        let mut state = self.state.lock();
        let id = HandlerId(state.next_id);
        state.next_id += 1;
        state.handlers.push(HandlerEntry { id, handler, once });
        id
    }
}
