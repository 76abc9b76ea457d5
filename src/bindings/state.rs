//! Binding state and change observation.

use crate::channel::ErrorChannel;
use crate::error::{BindError, PermissionError, Result};
use crate::types::Document;
use crossbeam_channel::{
    bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// What a binding currently exposes.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveState<T> {
    pub data: Option<T>,
    /// True from (re)subscribe until the first push or error.
    pub loading: bool,
}

impl<T> LiveState<T> {
    /// No subscription: nothing to show, nothing pending.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
        }
    }

    /// Subscribed, waiting for the first push.
    pub fn pending() -> Self {
        Self {
            data: None,
            loading: true,
        }
    }

    pub fn ready(data: Option<T>) -> Self {
        Self {
            data,
            loading: false,
        }
    }
}

impl LiveState<Vec<Document>> {
    /// Decode every document into `U`.
    pub fn decode_all<U: DeserializeOwned>(&self) -> Result<LiveState<Vec<U>>> {
        let data = match &self.data {
            Some(docs) => Some(
                docs.iter()
                    .map(Document::decode::<U>)
                    .collect::<Result<Vec<U>>>()?,
            ),
            None => None,
        };
        Ok(LiveState {
            data,
            loading: self.loading,
        })
    }
}

impl LiveState<Document> {
    /// Decode the document into `U`.
    pub fn decode<U: DeserializeOwned>(&self) -> Result<LiveState<U>> {
        let data = self.data.as_ref().map(Document::decode::<U>).transpose()?;
        Ok(LiveState {
            data,
            loading: self.loading,
        })
    }
}

/// States a watcher may have queued before it counts as stalled.
pub const DEFAULT_WATCH_BUFFER: usize = 64;

/// Receives a binding's state: the current value first, then every change.
///
/// The queue is bounded. A watcher that falls a full buffer behind is
/// detached: already-queued states can still be read, after which `recv`
/// reports disconnection. Use [`latest`](Self::latest) to keep up cheaply.
pub struct StateWatcher<T> {
    receiver: Receiver<LiveState<T>>,
}

impl<T> StateWatcher<T> {
    /// Receive the next state (blocking).
    pub fn recv(&self) -> std::result::Result<LiveState<T>, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a state (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<LiveState<T>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<LiveState<T>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything queued and return the most recent state.
    pub fn latest(&self) -> Option<LiveState<T>> {
        self.receiver.try_iter().last()
    }
}

/// State shared between a binding and its listener callbacks.
///
/// `generation` increments on every (re)subscribe; callbacks carry the
/// generation they were installed under and are ignored once it moves on.
pub(crate) struct BindingCell<T> {
    state: LiveState<T>,
    generation: u64,
    watchers: Vec<Sender<LiveState<T>>>,
}

pub(crate) type SharedCell<T> = Arc<Mutex<BindingCell<T>>>;

impl<T: Clone> BindingCell<T> {
    pub(crate) fn shared() -> SharedCell<T> {
        Arc::new(Mutex::new(Self {
            state: LiveState::idle(),
            generation: 0,
            watchers: Vec::new(),
        }))
    }

    pub(crate) fn state(&self) -> LiveState<T> {
        self.state.clone()
    }

    /// Start a new generation with cleared data. Returns the generation.
    pub(crate) fn reset(&mut self, loading: bool) -> u64 {
        self.generation += 1;
        self.state = LiveState {
            data: None,
            loading,
        };
        self.notify();
        self.generation
    }

    /// Apply a state if `generation` is still current.
    pub(crate) fn apply(&mut self, generation: u64, state: LiveState<T>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state = state;
        self.notify();
        true
    }

    pub(crate) fn watch(&mut self, buffer: usize) -> StateWatcher<T> {
        let (sender, receiver) = bounded(buffer.max(1));
        let _ = sender.try_send(self.state.clone());
        self.watchers.push(sender);
        StateWatcher { receiver }
    }

    fn notify(&mut self) {
        let state = &self.state;
        self.watchers.retain(|tx| match tx.try_send(state.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(buffer = ?tx.capacity(), "detaching stalled state watcher");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

/// Record a listener failure: publish the event, then settle on idle.
pub(crate) fn report_failure<T: Clone>(
    cell: &SharedCell<T>,
    errors: &ErrorChannel,
    generation: u64,
    event: PermissionError,
    cause: &BindError,
) {
    tracing::warn!(
        path = %event.path,
        operation = %event.operation,
        error = %cause,
        "live binding failed"
    );

    // Publish without holding the cell lock; handlers may read the binding.
    errors.publish_permission_error(event);

    if !cell.lock().apply(generation, LiveState::idle()) {
        tracing::debug!(generation, "failure from superseded subscription");
    }
}
