//! Live binding to a single document.

use super::state::{
    report_failure, BindingCell, LiveState, SharedCell, StateWatcher, DEFAULT_WATCH_BUFFER,
};
use crate::channel::ErrorChannel;
use crate::error::{BindError, PermissionError};
use crate::store::{DocumentSnapshot, ListenerRegistration, RemoteStore};
use crate::types::{Document, DocumentRef, Operation};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// The two ways of naming a document.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentTarget {
    /// Collection path plus document id.
    Path { path: String, id: String },
    /// A ready-made reference.
    Reference(DocumentRef),
}

impl DocumentTarget {
    pub fn path(path: impl Into<String>, id: impl Into<String>) -> Self {
        DocumentTarget::Path {
            path: path.into(),
            id: id.into(),
        }
    }

    /// Resolve to a reference.
    pub fn resolve(&self) -> crate::error::Result<DocumentRef> {
        match self {
            DocumentTarget::Path { path, id } => DocumentRef::new(path, id),
            DocumentTarget::Reference(reference) => Ok(reference.clone()),
        }
    }

    /// Raw path for error reports when resolution fails.
    fn raw_path(&self) -> String {
        match self {
            DocumentTarget::Path { path, id } => {
                format!("{}/{}", path.trim_matches('/'), id)
            }
            DocumentTarget::Reference(reference) => reference.path().canonical_string(),
        }
    }
}

impl From<DocumentRef> for DocumentTarget {
    fn from(reference: DocumentRef) -> Self {
        DocumentTarget::Reference(reference)
    }
}

/// Memoization key: what the target resolved to.
#[derive(Clone, Debug, PartialEq)]
enum Resolved {
    Reference(DocumentRef),
    Invalid(String),
}

/// Exposes `{ data: Document?, loading }` for one document.
///
/// Both calling conventions resolve to a [`DocumentRef`] before
/// subscribing, so `bind(Some("siteConfig"), Some("notifications"))` and
/// `bind_ref(Some(reference))` for the same document share a listener.
pub struct DocumentBinding {
    store: Arc<dyn RemoteStore>,
    errors: ErrorChannel,
    resolved: Option<Resolved>,
    registration: Option<ListenerRegistration>,
    cell: SharedCell<Document>,
}

impl DocumentBinding {
    pub fn new(store: Arc<dyn RemoteStore>, errors: ErrorChannel) -> Self {
        Self {
            store,
            errors,
            resolved: None,
            registration: None,
            cell: BindingCell::shared(),
        }
    }

    /// Watch `path/id`. A missing path or id means no subscription.
    pub fn bind(&mut self, path: Option<&str>, id: Option<&str>) -> LiveState<Document> {
        let target = match (path, id) {
            (Some(path), Some(id)) => Some(DocumentTarget::path(path, id)),
            _ => None,
        };
        self.bind_target(target)
    }

    /// Watch a ready-made reference.
    pub fn bind_ref(&mut self, reference: Option<DocumentRef>) -> LiveState<Document> {
        self.bind_target(reference.map(DocumentTarget::Reference))
    }

    pub fn bind_target(&mut self, target: Option<DocumentTarget>) -> LiveState<Document> {
        let resolved = target.map(|t| match t.resolve() {
            Ok(reference) => Resolved::Reference(reference),
            Err(_) => Resolved::Invalid(t.raw_path()),
        });

        if resolved == self.resolved {
            return self.state();
        }

        self.teardown();
        self.resolved = resolved.clone();

        match resolved {
            None => {
                self.cell.lock().reset(false);
                tracing::debug!("document binding cleared");
            }
            Some(Resolved::Invalid(raw)) => {
                let generation = self.cell.lock().reset(true);
                let err = BindError::InvalidPath(raw.clone());
                let event = PermissionError::new(raw, Operation::Get);
                report_failure(&self.cell, &self.errors, generation, event, &err);
            }
            Some(Resolved::Reference(reference)) => {
                let generation = self.cell.lock().reset(true);
                self.subscribe(reference, generation);
            }
        }

        self.state()
    }

    /// Stop watching.
    pub fn unbind(&mut self) {
        self.bind_target(None);
    }

    pub fn state(&self) -> LiveState<Document> {
        self.cell.lock().state()
    }

    /// Current state decoded into `T`.
    pub fn decoded<T: DeserializeOwned>(&self) -> crate::error::Result<LiveState<T>> {
        self.state().decode()
    }

    pub fn watch(&self) -> StateWatcher<Document> {
        self.watch_with_buffer(DEFAULT_WATCH_BUFFER)
    }

    /// Observe state changes, detaching after `buffer` unread states.
    pub fn watch_with_buffer(&self, buffer: usize) -> StateWatcher<Document> {
        self.cell.lock().watch(buffer)
    }

    /// Reference currently watched.
    pub fn reference(&self) -> Option<&DocumentRef> {
        match &self.resolved {
            Some(Resolved::Reference(reference)) => Some(reference),
            _ => None,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.registration.is_some()
    }

    fn subscribe(&mut self, reference: DocumentRef, generation: u64) {
        let path = self.store.canonical_path(reference.path());
        tracing::debug!(path = %path, generation, "document binding subscribing");

        let on_snapshot = {
            let cell = Arc::clone(&self.cell);
            Box::new(move |snapshot: DocumentSnapshot| {
                if !cell
                    .lock()
                    .apply(generation, LiveState::ready(snapshot.document))
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
                let event = PermissionError::new(path.clone(), Operation::Get);
                report_failure(&cell, &errors, generation, event, &err);
            })
        };

        match self.store.subscribe_document(reference, on_snapshot, on_error) {
            Ok(registration) => self.registration = Some(registration),
            Err(err) => {
                let event = PermissionError::new(path, Operation::Get);
                report_failure(&self.cell, &self.errors, generation, event, &err);
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.remove();
            tracing::debug!(resolved = ?self.resolved, "document binding released listener");
        }
    }
}

impl Drop for DocumentBinding {
    fn drop(&mut self) {
        self.teardown();
    }
}
