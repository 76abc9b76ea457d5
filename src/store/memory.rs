//! In-process document store with realtime listeners.

use super::export;
use super::rules::AccessRules;
use super::{
    DocumentSnapshot, ErrorCallback, ListenerRegistration, QuerySnapshot, RemoteStore,
    SetOptions, SnapshotCallback,
};
use crate::error::{BindError, PermissionError, Result};
use crate::types::{CollectionQuery, Document, DocumentRef, Fields, Operation, ResourcePath};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{ReentrantMutex, RwLock};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest auto id (a full hex SHA-256 digest).
const MAX_AUTO_ID_LENGTH: usize = 64;

/// When queued pushes reach listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Pushes wait on the queue until [`MemoryStore::flush`].
    #[default]
    Queued,
    /// Pushes are flushed before the triggering call returns.
    Immediate,
}

/// In-process store configuration.
#[derive(Clone, Debug)]
pub struct MemoryStoreConfig {
    pub delivery: Delivery,

    /// Length of server-assigned document ids.
    /// Default: 20
    pub auto_id_length: usize,

    /// Initial security rules.
    pub rules: AccessRules,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            delivery: Delivery::Queued,
            auto_id_length: 20,
            rules: AccessRules::allow_all(),
        }
    }
}

/// Documents by collection path, then by id.
pub(crate) type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

type ListenerId = u64;

enum Target {
    Query {
        query: CollectionQuery,
        on_snapshot: Arc<SnapshotCallback<QuerySnapshot>>,
    },
    Document {
        reference: DocumentRef,
        on_snapshot: Arc<SnapshotCallback<DocumentSnapshot>>,
    },
}

struct Listener {
    target: Target,
    on_error: Arc<ErrorCallback>,
    /// An error is queued; no further pushes are produced.
    terminated: bool,
}

impl Listener {
    fn collection(&self) -> ResourcePath {
        match &self.target {
            Target::Query { query, .. } => query.path.clone(),
            Target::Document { reference, .. } => reference.collection(),
        }
    }

    fn path(&self) -> String {
        match &self.target {
            Target::Query { query, .. } => query.path.canonical_string(),
            Target::Document { reference, .. } => reference.path().canonical_string(),
        }
    }

    fn read_operation(&self) -> Operation {
        match &self.target {
            Target::Query { .. } => Operation::List,
            Target::Document { .. } => Operation::Get,
        }
    }
}

enum Push {
    Query(QuerySnapshot),
    Document(DocumentSnapshot),
    Error(BindError),
}

struct Pending {
    listener: ListenerId,
    push: Push,
}

struct Inner {
    delivery: Delivery,
    auto_id_length: usize,
    rules: RwLock<AccessRules>,
    collections: RwLock<Collections>,
    /// Live listeners by id (ordered, so fan-out is deterministic).
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
    next_listener: AtomicU64,
    id_counter: AtomicU64,
    queue_tx: Sender<Pending>,
    queue_rx: Receiver<Pending>,
    /// Serializes delivery so pushes reach listeners in queue order.
    delivery_lock: ReentrantMutex<()>,
}

/// In-process [`RemoteStore`]. Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self::with_collections(config, Collections::new())
    }

    pub(crate) fn with_collections(config: MemoryStoreConfig, collections: Collections) -> Self {
        let (queue_tx, queue_rx) = unbounded();
        Self {
            inner: Arc::new(Inner {
                delivery: config.delivery,
                auto_id_length: config.auto_id_length.clamp(1, MAX_AUTO_ID_LENGTH),
                rules: RwLock::new(config.rules),
                collections: RwLock::new(collections),
                listeners: RwLock::new(BTreeMap::new()),
                next_listener: AtomicU64::new(1),
                id_counter: AtomicU64::new(0),
                queue_tx,
                queue_rx,
                delivery_lock: ReentrantMutex::new(()),
            }),
        }
    }

    /// Load a store from an export file.
    pub fn import_from(path: impl AsRef<Path>, config: MemoryStoreConfig) -> Result<Self> {
        let collections = export::read_export(path.as_ref())?;
        tracing::debug!(
            path = %path.as_ref().display(),
            collections = collections.len(),
            "store imported"
        );
        Ok(Self::with_collections(config, collections))
    }

    /// Write every document to an export file.
    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let collections = self.inner.collections.read().clone();
        export::write_export(path.as_ref(), &collections)
    }

    /// Deliver queued pushes in order. Returns the number delivered.
    pub fn flush(&self) -> usize {
        let _guard = self.inner.delivery_lock.lock();
        let mut delivered = 0;
        while let Ok(pending) = self.inner.queue_rx.try_recv() {
            if self.deliver(pending) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Pushes waiting for [`flush`](Self::flush).
    pub fn pending_pushes(&self) -> usize {
        self.inner.queue_rx.len()
    }

    /// Replace the security rules. Live listeners that may no longer read
    /// receive a permission error.
    pub fn set_rules(&self, rules: AccessRules) {
        {
            let mut listeners = self.inner.listeners.write();
            for (id, listener) in listeners.iter_mut() {
                if listener.terminated {
                    continue;
                }
                let operation = listener.read_operation();
                if !rules.permits(&listener.collection(), operation) {
                    listener.terminated = true;
                    let denial = PermissionError::new(listener.path(), operation);
                    self.enqueue(*id, Push::Error(BindError::PermissionDenied(denial)));
                }
            }
            *self.inner.rules.write() = rules;
        }
        self.maybe_flush();
    }

    /// Fail every live listener as if the connection dropped.
    pub fn disconnect(&self) {
        {
            let mut listeners = self.inner.listeners.write();
            for (id, listener) in listeners.iter_mut().filter(|(_, l)| !l.terminated) {
                listener.terminated = true;
                self.enqueue(
                    *id,
                    Push::Error(BindError::Unavailable("store disconnected".to_string())),
                );
            }
        }
        tracing::warn!("store disconnected, live listeners failed");
        self.maybe_flush();
    }

    /// Total documents across all collections.
    pub fn document_count(&self) -> usize {
        self.inner.collections.read().values().map(BTreeMap::len).sum()
    }

    fn deliver(&self, pending: Pending) -> bool {
        let id = pending.listener;
        match pending.push {
            Push::Query(snapshot) => {
                let callback = match self.inner.listeners.read().get(&id) {
                    Some(Listener {
                        target: Target::Query { on_snapshot, .. },
                        ..
                    }) => Arc::clone(on_snapshot),
                    _ => {
                        tracing::trace!(listener = id, "discarding push for removed listener");
                        return false;
                    }
                };
                tracing::trace!(listener = id, documents = snapshot.len(), "query push");
                callback(snapshot);
                true
            }
            Push::Document(snapshot) => {
                let callback = match self.inner.listeners.read().get(&id) {
                    Some(Listener {
                        target: Target::Document { on_snapshot, .. },
                        ..
                    }) => Arc::clone(on_snapshot),
                    _ => {
                        tracing::trace!(listener = id, "discarding push for removed listener");
                        return false;
                    }
                };
                tracing::trace!(listener = id, exists = snapshot.exists(), "document push");
                callback(snapshot);
                true
            }
            Push::Error(err) => {
                // Errors are terminal: the listener leaves the store first.
                let removed = self.inner.listeners.write().remove(&id);
                match removed {
                    Some(listener) => {
                        tracing::warn!(listener = id, path = %listener.path(), error = %err, "listener failed");
                        (listener.on_error)(err);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn enqueue(&self, listener: ListenerId, push: Push) {
        // The receiver lives in `inner`, so the queue cannot be disconnected.
        let _ = self.inner.queue_tx.send(Pending { listener, push });
    }

    fn maybe_flush(&self) {
        if self.inner.delivery == Delivery::Immediate {
            self.flush();
        }
    }

    fn check(&self, collection: &ResourcePath, path: String, operation: Operation) -> Result<()> {
        if self.inner.rules.read().permits(collection, operation) {
            Ok(())
        } else {
            Err(BindError::PermissionDenied(PermissionError::new(path, operation)))
        }
    }

    fn register(&self, target: Target, on_error: ErrorCallback) -> ListenerRegistration {
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        let mut listener = Listener {
            target,
            on_error: Arc::new(on_error),
            terminated: false,
        };

        {
            let collections = self.inner.collections.read();
            let operation = listener.read_operation();
            let permitted = self
                .inner
                .rules
                .read()
                .permits(&listener.collection(), operation);

            let push = if !permitted {
                listener.terminated = true;
                Push::Error(BindError::PermissionDenied(PermissionError::new(
                    listener.path(),
                    operation,
                )))
            } else {
                match &listener.target {
                    Target::Query { query, .. } => Push::Query(QuerySnapshot {
                        query: query.clone(),
                        documents: run_query(&collections, query, false),
                    }),
                    Target::Document { reference, .. } => {
                        Push::Document(read_document(&collections, reference))
                    }
                }
            };

            tracing::debug!(listener = id, path = %listener.path(), "listener added");
            self.inner.listeners.write().insert(id, listener);
            self.enqueue(id, push);
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let registration = ListenerRegistration::new(move || {
            if let Some(inner) = inner.upgrade() {
                if inner.listeners.write().remove(&id).is_some() {
                    tracing::debug!(listener = id, "listener removed");
                }
            }
        });

        self.maybe_flush();
        registration
    }

    /// Queue pushes for listeners affected by a write. Called with the
    /// collections lock held so pushes are queued in commit order.
    fn notify_write(
        &self,
        collections: &Collections,
        reference: &DocumentRef,
        before: Option<&Fields>,
        after: Option<&Fields>,
    ) {
        let collection = reference.collection();
        let listeners = self.inner.listeners.read();
        for (id, listener) in listeners.iter().filter(|(_, l)| !l.terminated) {
            match &listener.target {
                Target::Query { query, .. } if query.path == collection => {
                    let affected = before.map_or(false, |f| query.matches(f))
                        || after.map_or(false, |f| query.matches(f));
                    if affected {
                        self.enqueue(
                            *id,
                            Push::Query(QuerySnapshot {
                                query: query.clone(),
                                documents: run_query(collections, query, false),
                            }),
                        );
                    }
                }
                Target::Document { reference: watched, .. } if watched == reference => {
                    self.enqueue(
                        *id,
                        Push::Document(DocumentSnapshot {
                            reference: watched.clone(),
                            document: after.map(|f| Document::new(watched.id(), f.clone())),
                        }),
                    );
                }
                _ => {}
            }
        }
    }

    fn next_auto_id(&self, collection: &ResourcePath, existing: Option<&BTreeMap<String, Fields>>) -> String {
        loop {
            let counter = self.inner.id_counter.fetch_add(1, Ordering::SeqCst);
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);

            let mut hasher = Sha256::new();
            hasher.update(collection.canonical_string().as_bytes());
            hasher.update(counter.to_le_bytes());
            hasher.update(nanos.to_le_bytes());
            let mut id = hex::encode(hasher.finalize());
            id.truncate(self.inner.auto_id_length);

            if !existing.map_or(false, |docs| docs.contains_key(&id)) {
                return id;
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl RemoteStore for MemoryStore {
    fn subscribe_collection(
        &self,
        query: CollectionQuery,
        on_snapshot: SnapshotCallback<QuerySnapshot>,
        on_error: ErrorCallback,
    ) -> Result<ListenerRegistration> {
        Ok(self.register(
            Target::Query {
                query,
                on_snapshot: Arc::new(on_snapshot),
            },
            on_error,
        ))
    }

    fn subscribe_document(
        &self,
        reference: DocumentRef,
        on_snapshot: SnapshotCallback<DocumentSnapshot>,
        on_error: ErrorCallback,
    ) -> Result<ListenerRegistration> {
        Ok(self.register(
            Target::Document {
                reference,
                on_snapshot: Arc::new(on_snapshot),
            },
            on_error,
        ))
    }

    fn get_documents(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
        self.check(&query.path, query.path.canonical_string(), Operation::List)?;
        Ok(run_query(&self.inner.collections.read(), query, true))
    }

    fn get_document(&self, reference: &DocumentRef) -> Result<Option<Document>> {
        self.check(
            &reference.collection(),
            reference.path().canonical_string(),
            Operation::Get,
        )?;
        Ok(read_document(&self.inner.collections.read(), reference).document)
    }

    fn add_document(&self, collection: &ResourcePath, data: Fields) -> Result<DocumentRef> {
        if !collection.is_collection() {
            return Err(BindError::InvalidPath(format!(
                "{collection} is not a collection path"
            )));
        }
        self.check(collection, collection.canonical_string(), Operation::Create)?;

        let reference = {
            let mut collections = self.inner.collections.write();
            let key = collection.canonical_string();
            let id = self.next_auto_id(collection, collections.get(&key));
            let reference = DocumentRef::in_collection(collection, id.clone());

            collections.entry(key.clone()).or_default().insert(id.clone(), data);
            let after = collections.get(&key).and_then(|docs| docs.get(&id));
            self.notify_write(&collections, &reference, None, after);
            reference
        };

        tracing::debug!(path = %reference, "document added");
        self.maybe_flush();
        Ok(reference)
    }

    fn set_document(
        &self,
        reference: &DocumentRef,
        data: Fields,
        options: SetOptions,
    ) -> Result<()> {
        let collection = reference.collection();
        let key = collection.canonical_string();
        let path = reference.path().canonical_string();

        {
            let mut collections = self.inner.collections.write();
            let before = collections
                .get(&key)
                .and_then(|docs| docs.get(reference.id()))
                .cloned();
            let operation = if before.is_some() {
                Operation::Update
            } else {
                Operation::Create
            };
            self.check(&collection, path.clone(), operation)?;

            let next = match (&before, options.merge) {
                (Some(existing), true) => {
                    let mut merged = existing.clone();
                    deep_merge(&mut merged, data);
                    merged
                }
                _ => data,
            };

            collections
                .entry(key.clone())
                .or_default()
                .insert(reference.id().to_string(), next);
            let after = collections.get(&key).and_then(|docs| docs.get(reference.id()));
            self.notify_write(&collections, reference, before.as_ref(), after);
        }

        tracing::debug!(path = %path, merge = options.merge, "document set");
        self.maybe_flush();
        Ok(())
    }

    fn update_document(&self, reference: &DocumentRef, data: Fields) -> Result<()> {
        let collection = reference.collection();
        let key = collection.canonical_string();
        let path = reference.path().canonical_string();
        self.check(&collection, path.clone(), Operation::Update)?;

        {
            let mut collections = self.inner.collections.write();
            let before = collections
                .get(&key)
                .and_then(|docs| docs.get(reference.id()))
                .cloned()
                .ok_or_else(|| BindError::DocumentNotFound(path.clone()))?;

            let mut next = before.clone();
            for (field, value) in data {
                set_field_path(&mut next, &field, value);
            }

            collections
                .entry(key.clone())
                .or_default()
                .insert(reference.id().to_string(), next);
            let after = collections.get(&key).and_then(|docs| docs.get(reference.id()));
            self.notify_write(&collections, reference, Some(&before), after);
        }

        tracing::debug!(path = %path, "document updated");
        self.maybe_flush();
        Ok(())
    }

    fn delete_document(&self, reference: &DocumentRef) -> Result<()> {
        let collection = reference.collection();
        let path = reference.path().canonical_string();
        self.check(&collection, path.clone(), Operation::Delete)?;

        {
            let mut collections = self.inner.collections.write();
            let removed = collections
                .get_mut(&collection.canonical_string())
                .and_then(|docs| docs.remove(reference.id()));
            if let Some(before) = removed {
                self.notify_write(&collections, reference, Some(&before), None);
                tracing::debug!(path = %path, "document deleted");
            }
        }

        self.maybe_flush();
        Ok(())
    }

    fn active_listeners(&self) -> usize {
        self.inner
            .listeners
            .read()
            .values()
            .filter(|l| !l.terminated)
            .count()
    }
}

/// Matching documents in id order.
fn run_query(collections: &Collections, query: &CollectionQuery, honor_limit: bool) -> Vec<Document> {
    let limit = if honor_limit { query.limit } else { None };
    collections
        .get(&query.path.canonical_string())
        .map(|docs| {
            docs.iter()
                .filter(|(_, fields)| query.matches(fields))
                .take(limit.unwrap_or(usize::MAX))
                .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn read_document(collections: &Collections, reference: &DocumentRef) -> DocumentSnapshot {
    let document = collections
        .get(&reference.collection().canonical_string())
        .and_then(|docs| docs.get(reference.id()))
        .map(|fields| Document::new(reference.id(), fields.clone()));
    DocumentSnapshot {
        reference: reference.clone(),
        document,
    }
}

/// Merge `source` into `target`, recursing into nested maps.
fn deep_merge(target: &mut Fields, source: Fields) {
    for (key, value) in source {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                deep_merge(existing, incoming);
                continue;
            }
            target.insert(key, Value::Object(incoming));
        } else {
            target.insert(key, value);
        }
    }
}

/// Set a dotted field path, creating intermediate maps.
fn set_field_path(fields: &mut Fields, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Fields::new()));
            if !entry.is_object() {
                *entry = Value::Object(Fields::new());
            }
            if let Value::Object(nested) = entry {
                set_field_path(nested, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn collect_queries(
        store: &MemoryStore,
        query: CollectionQuery,
    ) -> (Arc<Mutex<Vec<QuerySnapshot>>>, Arc<Mutex<Vec<String>>>, ListenerRegistration) {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let registration = {
            let snapshots = Arc::clone(&snapshots);
            let errors = Arc::clone(&errors);
            store
                .subscribe_collection(
                    query,
                    Box::new(move |s: QuerySnapshot| snapshots.lock().push(s)),
                    Box::new(move |e: BindError| errors.lock().push(e.to_string())),
                )
                .unwrap()
        };
        (snapshots, errors, registration)
    }

    #[test]
    fn test_initial_push_waits_for_flush() {
        let store = MemoryStore::default();
        let query = CollectionQuery::new("videos").unwrap();
        let (snapshots, _, _registration) = collect_queries(&store, query);

        assert!(snapshots.lock().is_empty());
        assert_eq!(store.pending_pushes(), 1);

        assert_eq!(store.flush(), 1);
        assert_eq!(snapshots.lock().len(), 1);
        assert!(snapshots.lock()[0].is_empty());
    }

    #[test]
    fn test_immediate_delivery() {
        let store = MemoryStore::new(MemoryStoreConfig {
            delivery: Delivery::Immediate,
            ..Default::default()
        });
        let query = CollectionQuery::new("videos").unwrap();
        let (snapshots, _, _registration) = collect_queries(&store, query);
        assert_eq!(snapshots.lock().len(), 1);

        let videos = ResourcePath::collection("videos").unwrap();
        store
            .add_document(&videos, fields(json!({"title": "Kedarnath trek"})))
            .unwrap();
        assert_eq!(snapshots.lock().len(), 2);
        assert_eq!(snapshots.lock()[1].len(), 1);
    }

    #[test]
    fn test_documents_in_id_order() {
        let store = MemoryStore::default();
        for id in ["c", "a", "b"] {
            store
                .set_document(
                    &DocumentRef::new("blog", id).unwrap(),
                    fields(json!({"title": id})),
                    SetOptions::default(),
                )
                .unwrap();
        }

        let docs = store.get_documents(&CollectionQuery::new("blog").unwrap()).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filtered_listener_ignores_unrelated_writes() {
        let store = MemoryStore::default();
        let query = CollectionQuery::new("testimonials")
            .unwrap()
            .with_filter(crate::types::FieldFilter::eq("approved", true));
        let (snapshots, _, _registration) = collect_queries(&store, query);
        store.flush();

        let col = ResourcePath::collection("testimonials").unwrap();
        store
            .add_document(&col, fields(json!({"userName": "Meera", "approved": false})))
            .unwrap();
        assert_eq!(store.flush(), 0);

        store
            .add_document(&col, fields(json!({"userName": "Arjun", "approved": true})))
            .unwrap();
        assert_eq!(store.flush(), 1);
        assert_eq!(snapshots.lock().last().unwrap().len(), 1);
    }

    #[test]
    fn test_removed_listener_gets_no_stale_push() {
        let store = MemoryStore::default();
        let (snapshots, _, registration) =
            collect_queries(&store, CollectionQuery::new("videos").unwrap());

        registration.remove();
        assert_eq!(store.active_listeners(), 0);
        assert_eq!(store.flush(), 0);
        assert!(snapshots.lock().is_empty());
    }

    #[test]
    fn test_denied_listener_receives_error_and_terminates() {
        let store = MemoryStore::new(MemoryStoreConfig {
            rules: AccessRules::allow_all().deny("holidayPackages", &[Operation::List]),
            ..Default::default()
        });
        let (snapshots, errors, _registration) =
            collect_queries(&store, CollectionQuery::new("holidayPackages").unwrap());

        assert_eq!(store.active_listeners(), 0);
        store.flush();
        assert!(snapshots.lock().is_empty());
        assert_eq!(errors.lock().len(), 1);
        assert!(errors.lock()[0].contains("holidayPackages"));
    }

    #[test]
    fn test_set_rules_revokes_live_listener() {
        let store = MemoryStore::default();
        let (_, errors, _registration) =
            collect_queries(&store, CollectionQuery::new("videos").unwrap());
        store.flush();
        assert_eq!(store.active_listeners(), 1);

        store.set_rules(AccessRules::deny_all());
        assert_eq!(store.active_listeners(), 0);
        store.flush();
        assert_eq!(errors.lock().len(), 1);
    }

    #[test]
    fn test_disconnect_fails_listeners() {
        let store = MemoryStore::default();
        let (_, errors, _registration) =
            collect_queries(&store, CollectionQuery::new("videos").unwrap());
        store.disconnect();
        store.flush();

        assert_eq!(errors.lock().len(), 1);
        assert!(errors.lock()[0].contains("unavailable"));
    }

    #[test]
    fn test_write_denied() {
        let store = MemoryStore::new(MemoryStoreConfig {
            rules: AccessRules::public_read(),
            ..Default::default()
        });
        let col = ResourcePath::collection("blog").unwrap();
        let result = store.add_document(&col, Fields::new());

        match result {
            Err(BindError::PermissionDenied(err)) => {
                assert_eq!(err.path, "blog");
                assert_eq!(err.operation, Operation::Create);
            }
            other => panic!("Expected PermissionDenied, got {:?}", other),
        }
        assert_eq!(store.document_count(), 0);
    }

    #[test]
    fn test_set_merge_is_deep() {
        let store = MemoryStore::default();
        let doc = DocumentRef::new("siteConfig", "notifications").unwrap();
        store
            .set_document(
                &doc,
                fields(json!({"notifications": ["a"], "theme": {"color": "teal", "font": "serif"}})),
                SetOptions::default(),
            )
            .unwrap();
        store
            .set_document(
                &doc,
                fields(json!({"homePageVideoId": "xyz", "theme": {"color": "amber"}})),
                SetOptions::merge(),
            )
            .unwrap();

        let stored = store.get_document(&doc).unwrap().unwrap();
        assert_eq!(stored.get("notifications"), Some(&json!(["a"])));
        assert_eq!(stored.get("homePageVideoId"), Some(&json!("xyz")));
        assert_eq!(stored.get("theme.color"), Some(&json!("amber")));
        assert_eq!(stored.get("theme.font"), Some(&json!("serif")));
    }

    #[test]
    fn test_update_requires_existing_document() {
        let store = MemoryStore::default();
        let doc = DocumentRef::new("testimonials", "missing").unwrap();
        let result = store.update_document(&doc, fields(json!({"approved": true})));
        assert!(matches!(result, Err(BindError::DocumentNotFound(_))));
    }

    #[test]
    fn test_update_dotted_paths() {
        let store = MemoryStore::default();
        let doc = DocumentRef::new("holidayPackages", "p1").unwrap();
        store
            .set_document(&doc, fields(json!({"name": "Goa", "price": {"base": 100}})), SetOptions::default())
            .unwrap();
        store
            .update_document(&doc, fields(json!({"price.base": 120, "price.tax": 18})))
            .unwrap();

        let stored = store.get_document(&doc).unwrap().unwrap();
        assert_eq!(stored.get("price.base"), Some(&json!(120)));
        assert_eq!(stored.get("price.tax"), Some(&json!(18)));
        assert_eq!(stored.get("name"), Some(&json!("Goa")));
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemoryStore::default();
        let doc = DocumentRef::new("videos", "nope").unwrap();
        assert!(store.delete_document(&doc).is_ok());
    }

    #[test]
    fn test_auto_ids_are_unique_hex() {
        let store = MemoryStore::default();
        let col = ResourcePath::collection("galleryImages").unwrap();
        let a = store.add_document(&col, Fields::new()).unwrap();
        let b = store.add_document(&col, Fields::new()).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 20);
        assert!(a.id().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_get_documents_honors_limit() {
        let store = MemoryStore::default();
        let col = ResourcePath::collection("holidayPackages").unwrap();
        for _ in 0..3 {
            store.add_document(&col, fields(json!({"slug": "manali"}))).unwrap();
        }
        let query = CollectionQuery::new("holidayPackages")
            .unwrap()
            .with_filter(crate::types::FieldFilter::eq("slug", "manali"))
            .with_limit(1);
        assert_eq!(store.get_documents(&query).unwrap().len(), 1);
    }
}
