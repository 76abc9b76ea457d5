//! Write helpers that report denials on the error channel.
//!
//! Each helper performs one write and, on failure, publishes a permission
//! event carrying the path, the operation and the data being written. The
//! error is also returned so the caller can skip its success path; it does
//! not need to report it again.

use crate::channel::ErrorChannel;
use crate::error::{BindError, PermissionError, Result};
use crate::store::{RemoteStore, SetOptions};
use crate::types::{DocumentRef, Fields, Operation, ResourcePath};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Write front-end over a store handle.
#[derive(Clone)]
pub struct Mutations {
    store: Arc<dyn RemoteStore>,
    errors: ErrorChannel,
}

impl Mutations {
    pub fn new(store: Arc<dyn RemoteStore>, errors: ErrorChannel) -> Self {
        Self { store, errors }
    }

    /// Create a document with a server-assigned id (reported as `create`).
    pub fn add(&self, collection_path: &str, data: Fields) -> Result<DocumentRef> {
        let payload = Value::Object(data.clone());
        let result = ResourcePath::collection(collection_path)
            .and_then(|collection| self.store.add_document(&collection, data));
        self.reported(result, collection_path.trim_matches('/'), Operation::Create, Some(payload))
    }

    /// Write a whole document (reported as `update`).
    pub fn set(&self, reference: &DocumentRef, data: Fields, options: SetOptions) -> Result<()> {
        let payload = Value::Object(data.clone());
        let result = self.store.set_document(reference, data, options);
        self.reported(result, &self.path_of(reference), Operation::Update, Some(payload))
    }

    /// Update fields of an existing document.
    pub fn update(&self, reference: &DocumentRef, data: Fields) -> Result<()> {
        let payload = Value::Object(data.clone());
        let result = self.store.update_document(reference, data);
        self.reported(result, &self.path_of(reference), Operation::Update, Some(payload))
    }

    pub fn delete(&self, reference: &DocumentRef) -> Result<()> {
        let result = self.store.delete_document(reference);
        self.reported(result, &self.path_of(reference), Operation::Delete, None)
    }

    /// [`add`](Self::add) for any serializable value.
    pub fn add_typed<T: Serialize>(&self, collection_path: &str, value: &T) -> Result<DocumentRef> {
        self.add(collection_path, to_fields(value)?)
    }

    /// [`set`](Self::set) for any serializable value.
    pub fn set_typed<T: Serialize>(
        &self,
        reference: &DocumentRef,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        self.set(reference, to_fields(value)?, options)
    }

    /// [`update`](Self::update) for any serializable value.
    pub fn update_typed<T: Serialize>(&self, reference: &DocumentRef, value: &T) -> Result<()> {
        self.update(reference, to_fields(value)?)
    }

    fn path_of(&self, reference: &DocumentRef) -> String {
        self.store.canonical_path(reference.path())
    }

    fn reported<T>(
        &self,
        result: Result<T>,
        path: &str,
        operation: Operation,
        payload: Option<Value>,
    ) -> Result<T> {
        if let Err(err) = &result {
            let mut event = PermissionError::new(path, operation);
            event.request_resource_data = payload;
            tracing::warn!(path, operation = %operation, error = %err, "write failed");
            self.errors.publish_permission_error(event);
        }
        result
    }
}

/// Serialize a value into a document field map.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(BindError::Serialization(format!(
            "documents must serialize to a map, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PERMISSION_ERROR;
    use crate::store::{AccessRules, MemoryStore, MemoryStoreConfig};
    use parking_lot::Mutex;
    use serde_json::json;

    fn harness(rules: AccessRules) -> (Mutations, Arc<MemoryStore>, Arc<Mutex<Vec<PermissionError>>>, crate::channel::ChannelSubscription) {
        let store = Arc::new(MemoryStore::new(MemoryStoreConfig {
            rules,
            ..Default::default()
        }));
        let channel = ErrorChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sub = {
            let seen = Arc::clone(&seen);
            channel.subscribe(PERMISSION_ERROR, move |event| {
                if let Some(err) = event.as_permission_error() {
                    seen.lock().push(err.clone());
                }
            })
        };
        (Mutations::new(store.clone(), channel), store, seen, sub)
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_successful_add_publishes_nothing() {
        let (mutations, store, seen, _sub) = harness(AccessRules::allow_all());
        let reference = mutations
            .add("videos", fields(json!({"title": "Ladakh", "videoId": "abc123"})))
            .unwrap();

        assert_eq!(reference.collection().canonical_string(), "videos");
        assert_eq!(store.document_count(), 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_denied_add_reports_create_with_payload() {
        let (mutations, _store, seen, _sub) = harness(AccessRules::public_read());
        let data = fields(json!({"userName": "Kavya", "content": "Lovely trip to Munnar", "rating": 5}));

        let result = mutations.add("/testimonials", data);
        assert!(matches!(result, Err(BindError::PermissionDenied(_))));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "testimonials");
        assert_eq!(seen[0].operation, Operation::Create);
        assert_eq!(seen[0].request_resource_data.as_ref().unwrap()["userName"], "Kavya");
    }

    #[test]
    fn test_denied_set_reports_update() {
        let (mutations, _store, seen, _sub) = harness(AccessRules::public_read());
        let reference = DocumentRef::new("siteConfig", "notifications").unwrap();

        let _ = mutations.set(
            &reference,
            fields(json!({"notifications": ["a", "b", "c"]})),
            SetOptions::default(),
        );

        let seen = seen.lock();
        assert_eq!(seen[0].path, "siteConfig/notifications");
        assert_eq!(seen[0].operation, Operation::Update);
    }

    #[test]
    fn test_denied_delete_has_no_payload() {
        let (mutations, _store, seen, _sub) = harness(AccessRules::public_read());
        let reference = DocumentRef::new("blog", "post-1").unwrap();

        assert!(mutations.delete(&reference).is_err());
        let seen = seen.lock();
        assert_eq!(seen[0].operation, Operation::Delete);
        assert!(seen[0].request_resource_data.is_none());
    }

    #[test]
    fn test_update_missing_document_is_reported() {
        let (mutations, _store, seen, _sub) = harness(AccessRules::allow_all());
        let reference = DocumentRef::new("testimonials", "gone").unwrap();

        let result = mutations.update(&reference, fields(json!({"approved": true})));
        assert!(matches!(result, Err(BindError::DocumentNotFound(_))));
        assert_eq!(seen.lock()[0].operation, Operation::Update);
    }

    #[test]
    fn test_to_fields_rejects_non_maps() {
        assert!(to_fields(&json!({"a": 1})).is_ok());
        assert!(matches!(to_fields(&vec![1, 2]), Err(BindError::Serialization(_))));
    }
}
