//! Error types for live bindings and the document store.

use crate::types::Operation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for store and binding operations.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(PermissionError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Invalid export format: {0}")]
    InvalidFormat(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BindError {
    /// True for a security-rule rejection.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, BindError::PermissionDenied(_))
    }
}

impl From<serde_json::Error> for BindError {
    fn from(e: serde_json::Error) -> Self {
        BindError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for BindError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        BindError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BindError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        BindError::Deserialization(e.to_string())
    }
}

impl From<ValidationErrors> for BindError {
    fn from(e: ValidationErrors) -> Self {
        BindError::Validation(e)
    }
}

impl From<PermissionError> for BindError {
    fn from(e: PermissionError) -> Self {
        BindError::PermissionDenied(e)
    }
}

/// Result type for store and binding operations.
pub type Result<T> = std::result::Result<T, BindError>;

/// One rejected form field and the message shown next to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every rejected field of a form, in field order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message for `field`, if it was rejected.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Context of a request rejected by the store's security rules.
///
/// This is the payload of the permission-error event published on the
/// [`ErrorChannel`](crate::channel::ErrorChannel). It carries everything a
/// developer needs to find the offending rule: the canonical path, the
/// operation, and the data that was being written (for writes).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionError {
    pub path: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_resource_data: Option<serde_json::Value>,
}

impl PermissionError {
    pub fn new(path: impl Into<String>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
            request_resource_data: None,
        }
    }

    /// Attach the payload of the rejected write.
    pub fn with_request_data(mut self, data: serde_json::Value) -> Self {
        self.request_resource_data = Some(data);
        self
    }

    /// Pretty-printed JSON of the rule context.
    pub fn context_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            format!("{{ \"path\": {:?}, \"operation\": \"{}\" }}", self.path, self.operation)
        })
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing or insufficient permissions: the following request was denied by security rules:\n{}",
            self.context_json()
        )
    }
}

impl std::error::Error for PermissionError {}
