//! Remote document store contract.
//!
//! [`RemoteStore`] is the handle bindings talk to: realtime listeners on
//! collections and single documents, one-shot reads, and writes. Listeners
//! are callback pairs with an explicit disposer:
//! - subscribing returns immediately with a [`ListenerRegistration`]
//! - snapshots arrive asynchronously, any number of times, in store order
//! - a listener error is terminal for that listener
//!
//! [`MemoryStore`] is the in-process implementation used for local
//! development and tests. It enforces [`AccessRules`] and can export and
//! import its contents.

mod export;
mod memory;
mod rules;

pub use memory::{Delivery, MemoryStore, MemoryStoreConfig};
pub use rules::AccessRules;

use crate::error::{BindError, Result};
use crate::types::{CollectionQuery, Document, DocumentRef, Fields, ResourcePath};
use std::fmt;

/// Callback invoked for each delivered snapshot.
pub type SnapshotCallback<S> = Box<dyn Fn(S) + Send + Sync>;

/// Callback invoked once when a listener fails.
pub type ErrorCallback = Box<dyn Fn(BindError) + Send + Sync>;

/// One delivered state of a collection query.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySnapshot {
    pub query: CollectionQuery,
    /// Matching documents in store order.
    pub documents: Vec<Document>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One delivered state of a single document.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub reference: DocumentRef,
    /// `None` when the document does not exist.
    pub document: Option<Document>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.document.is_some()
    }
}

/// Options for [`RemoteStore::set_document`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into existing fields instead of replacing the document.
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Handle to a network listener. Removing or dropping it releases the
/// listener; removal is idempotent.
#[must_use = "dropping a ListenerRegistration removes the listener"]
pub struct ListenerRegistration {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerRegistration {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Registration with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the listener now.
    pub fn remove(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// A document database with push-based change notification.
pub trait RemoteStore: Send + Sync {
    /// Listen to every document matching `query`.
    fn subscribe_collection(
        &self,
        query: CollectionQuery,
        on_snapshot: SnapshotCallback<QuerySnapshot>,
        on_error: ErrorCallback,
    ) -> Result<ListenerRegistration>;

    /// Listen to a single document.
    fn subscribe_document(
        &self,
        reference: DocumentRef,
        on_snapshot: SnapshotCallback<DocumentSnapshot>,
        on_error: ErrorCallback,
    ) -> Result<ListenerRegistration>;

    /// Path string used when reporting errors about `path`.
    fn canonical_path(&self, path: &ResourcePath) -> String {
        path.canonical_string()
    }

    /// One-shot read of a collection query (honors `limit`).
    fn get_documents(&self, query: &CollectionQuery) -> Result<Vec<Document>>;

    /// One-shot read of a single document.
    fn get_document(&self, reference: &DocumentRef) -> Result<Option<Document>>;

    /// Create a document with a server-assigned id.
    fn add_document(&self, collection: &ResourcePath, data: Fields) -> Result<DocumentRef>;

    /// Write a document, replacing it unless `options.merge` is set.
    fn set_document(&self, reference: &DocumentRef, data: Fields, options: SetOptions)
        -> Result<()>;

    /// Update fields of an existing document. Dotted keys address nested fields.
    fn update_document(&self, reference: &DocumentRef, data: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    fn delete_document(&self, reference: &DocumentRef) -> Result<()>;

    /// Number of live listeners.
    fn active_listeners(&self) -> usize;
}
