//! Publish/subscribe bus for structured error events.

use crate::error::PermissionError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Well-known event name for security-rule denials.
pub const PERMISSION_ERROR: &str = "permission-error";

/// Events carried by the channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    /// A read or write was rejected by the store.
    PermissionDenied(PermissionError),
}

impl ChannelEvent {
    /// Event name handlers subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::PermissionDenied(_) => PERMISSION_ERROR,
        }
    }

    pub fn as_permission_error(&self) -> Option<&PermissionError> {
        match self {
            ChannelEvent::PermissionDenied(err) => Some(err),
        }
    }
}

type Handler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

struct Registered {
    id: u64,
    event: String,
    handler: Handler,
}

struct ChannelInner {
    /// Handlers in registration order.
    handlers: RwLock<Vec<Registered>>,
    next_id: AtomicU64,
}

impl ChannelInner {
    fn remove(&self, id: u64) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.id != id);
        handlers.len() != before
    }
}

/// Multi-subscriber event bus. Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct ErrorChannel {
    inner: Arc<ChannelInner>,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                handlers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a handler for the named event.
    ///
    /// The handler stays registered until the returned subscription is
    /// dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> ChannelSubscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.handlers.write().push(Registered {
            id,
            event: event.to_string(),
            handler: Arc::new(handler),
        });

        tracing::debug!(event, handler = id, "channel handler registered");

        ChannelSubscription {
            id,
            channel: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Deliver an event to every handler registered for its name.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, event: ChannelEvent) -> usize {
        // Snapshot the handler list so handlers may (un)subscribe re-entrantly.
        let targets: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .iter()
            .filter(|h| h.event == event.name())
            .map(|h| Arc::clone(&h.handler))
            .collect();

        if targets.is_empty() {
            tracing::debug!(event = event.name(), "event published with no handlers");
        }

        for handler in &targets {
            handler(&event);
        }
        targets.len()
    }

    /// Publish a permission-denied event.
    pub fn publish_permission_error(&self, error: PermissionError) -> usize {
        self.publish(ChannelEvent::PermissionDenied(error))
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .handlers
            .read()
            .iter()
            .filter(|h| h.event == event)
            .count()
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a channel handler. Dropping it unsubscribes.
#[must_use = "dropping a ChannelSubscription unsubscribes its handler"]
pub struct ChannelSubscription {
    id: u64,
    channel: Weak<ChannelInner>,
    active: bool,
}

impl ChannelSubscription {
    /// Remove the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the handler registered for the lifetime of the channel.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.channel.upgrade() {
            if inner.remove(self.id) {
                tracing::debug!(handler = self.id, "channel handler removed");
            }
        }
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
