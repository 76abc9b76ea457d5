//! Live binding to a (filtered) collection.

use super::state::{
    report_failure, BindingCell, LiveState, SharedCell, StateWatcher, DEFAULT_WATCH_BUFFER,
};
use crate::channel::ErrorChannel;
use crate::error::{BindError, PermissionError};
use crate::store::{ListenerRegistration, QuerySnapshot, RemoteStore};
use crate::types::{Document, FieldFilter, Operation, QueryDescriptor};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Exposes `{ data: Vec<Document>?, loading }` for the live contents of a
/// collection.
///
/// Call [`bind`](Self::bind) whenever the inputs may have changed (on every
/// render, say). Structurally equal inputs keep the current listener;
/// anything else tears it down and subscribes again. Dropping the binding
/// releases its listener.
pub struct CollectionBinding {
    store: Arc<dyn RemoteStore>,
    errors: ErrorChannel,
    descriptor: Option<QueryDescriptor>,
    registration: Option<ListenerRegistration>,
    cell: SharedCell<Vec<Document>>,
}

impl CollectionBinding {
    pub fn new(store: Arc<dyn RemoteStore>, errors: ErrorChannel) -> Self {
        Self {
            store,
            errors,
            descriptor: None,
            registration: None,
            cell: BindingCell::shared(),
        }
    }

    /// Watch `path`, optionally filtered. `None` means no subscription.
    pub fn bind(
        &mut self,
        path: Option<&str>,
        filter: Option<FieldFilter>,
    ) -> LiveState<Vec<Document>> {
        self.bind_descriptor(path.map(|p| QueryDescriptor::new(p, filter)))
    }

    /// Watch whatever `descriptor` names.
    pub fn bind_descriptor(
        &mut self,
        descriptor: Option<QueryDescriptor>,
    ) -> LiveState<Vec<Document>> {
        if descriptor == self.descriptor {
            return self.state();
        }

        self.teardown();
        self.descriptor = descriptor.clone();

        match descriptor {
            None => {
                self.cell.lock().reset(false);
                tracing::debug!("collection binding cleared");
            }
            Some(descriptor) => {
                let generation = self.cell.lock().reset(true);
                self.subscribe(descriptor, generation);
            }
        }

        self.state()
    }

    /// Stop watching. Same as `bind(None, None)`.
    pub fn unbind(&mut self) {
        self.bind_descriptor(None);
    }

    pub fn state(&self) -> LiveState<Vec<Document>> {
        self.cell.lock().state()
    }

    /// Current state decoded into `T`.
    pub fn decoded<T: DeserializeOwned>(&self) -> crate::error::Result<LiveState<Vec<T>>> {
        self.state().decode_all()
    }

    /// Observe state changes.
    pub fn watch(&self) -> StateWatcher<Vec<Document>> {
        self.watch_with_buffer(DEFAULT_WATCH_BUFFER)
    }

    /// Observe state changes, detaching after `buffer` unread states.
    pub fn watch_with_buffer(&self, buffer: usize) -> StateWatcher<Vec<Document>> {
        self.cell.lock().watch(buffer)
    }

    pub fn descriptor(&self) -> Option<&QueryDescriptor> {
        self.descriptor.as_ref()
    }

    /// Whether a store listener is held.
    pub fn is_subscribed(&self) -> bool {
        self.registration.is_some()
    }

    fn subscribe(&mut self, descriptor: QueryDescriptor, generation: u64) {
        let query = match descriptor.to_query() {
            Ok(query) => query,
            Err(err) => {
                let event = PermissionError::new(descriptor.path.clone(), Operation::List);
                report_failure(&self.cell, &self.errors, generation, event, &err);
                return;
            }
        };

        let path = self.store.canonical_path(&query.path);
        tracing::debug!(path = %path, filter = ?query.filter, generation, "collection binding subscribing");

        let on_snapshot = {
            let cell = Arc::clone(&self.cell);
            Box::new(move |snapshot: QuerySnapshot| {
                let QuerySnapshot { documents, .. } = snapshot;
                if !cell
                    .lock()
                    .apply(generation, LiveState::ready(Some(documents)))
                {
                    tracing::warn!(generation, "ignoring push from superseded subscription");
                }
            })
        };

        let on_error = {
            let cell = Arc::clone(&self.cell);
            let errors = self.errors.clone();
            let path = path.clone();
            Box::new(move |err: BindError| {
                let event = PermissionError::new(path.clone(), Operation::List);
                report_failure(&cell, &errors, generation, event, &err);
            })
        };

        match self.store.subscribe_collection(query, on_snapshot, on_error) {
            Ok(registration) => self.registration = Some(registration),
            Err(err) => {
                let event = PermissionError::new(path, Operation::List);
                report_failure(&self.cell, &self.errors, generation, event, &err);
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.remove();
            tracing::debug!(descriptor = ?self.descriptor, "collection binding released listener");
        }
    }
}

impl Drop for CollectionBinding {
    fn drop(&mut self) {
        self.teardown();
    }
}
