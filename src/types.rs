//! Core types: paths, references, documents and query descriptors.

use crate::error::{BindError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// Slash-separated location in the document tree.
///
/// Odd segment counts address collections (`holidayPackages`), even counts
/// address documents (`siteConfig/notifications`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// Parse a path. Leading and trailing slashes are ignored; empty
    /// segments are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(BindError::InvalidPath(path.to_string()));
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(BindError::InvalidPath(path.to_string()));
        }

        Ok(Self { segments })
    }

    /// Parse a path that must address a collection.
    pub fn collection(path: &str) -> Result<Self> {
        let parsed = Self::parse(path)?;
        if !parsed.is_collection() {
            return Err(BindError::InvalidPath(format!(
                "{path} is not a collection path"
            )));
        }
        Ok(parsed)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_collection(&self) -> bool {
        self.segments.len() % 2 == 1
    }

    pub fn is_document(&self) -> bool {
        !self.segments.is_empty() && self.segments.len() % 2 == 0
    }

    /// Final segment (collection name or document id).
    pub fn last_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Segments joined with `/`, no leading slash.
    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Debug for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.canonical_string())
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

/// Reference to a single document.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    path: ResourcePath,
}

impl DocumentRef {
    /// Build a reference from a collection path and a document id.
    pub fn new(collection_path: &str, id: &str) -> Result<Self> {
        let collection = ResourcePath::collection(collection_path)?;
        if id.is_empty() || id.contains('/') {
            return Err(BindError::InvalidPath(format!(
                "{collection_path}/{id}: invalid document id"
            )));
        }
        Ok(Self {
            path: collection.child(id),
        })
    }

    /// Build a reference from a full document path.
    pub fn from_path(path: &str) -> Result<Self> {
        let parsed = ResourcePath::parse(path)?;
        if !parsed.is_document() {
            return Err(BindError::InvalidPath(format!(
                "{path} is not a document path"
            )));
        }
        Ok(Self { path: parsed })
    }

    pub(crate) fn in_collection(collection: &ResourcePath, id: impl Into<String>) -> Self {
        Self {
            path: collection.child(id),
        }
    }

    pub fn id(&self) -> &str {
        self.path.last_segment()
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Path of the collection holding this document.
    pub fn collection(&self) -> ResourcePath {
        // A document path always has at least two segments.
        self.path.parent().unwrap_or_else(|| self.path.clone())
    }
}

impl fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentRef({})", self.path)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// A stored document: server-assigned id plus an opaque field map.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a field, following dotted paths into nested maps.
    pub fn get(&self, field: &str) -> Option<&Value> {
        lookup_field(&self.fields, field)
    }

    /// Field map with the identifier merged in under `id`.
    ///
    /// A stored field named `id` takes precedence over the identifier.
    pub fn to_value(&self) -> Value {
        let mut merged = Fields::new();
        merged.insert("id".to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            merged.insert(key.clone(), value.clone());
        }
        Value::Object(merged)
    }

    /// Decode the merged field map into a caller-chosen shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value())
            .map_err(|e| BindError::Deserialization(format!("document {}: {}", self.id, e)))
    }
}

/// Resolve a dotted field path (`address.city`) inside a field map.
pub(crate) fn lookup_field<'a>(fields: &'a Fields, field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Comparison operator of a field filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Equal,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Equal => write!(f, "=="),
        }
    }
}

/// A `(field, operator, value)` filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    /// Equality filter: `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        match self.op {
            FilterOp::Equal => lookup_field(fields, &self.field)
                .map_or(false, |stored| values_equal(stored, &self.value)),
        }
    }
}

/// Equality as the store sees it: numbers compare by value, so `5` and
/// `5.0` are equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// Value-equality key identifying what a collection binding watches.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
    pub path: String,
    pub filter: Option<FieldFilter>,
}

impl QueryDescriptor {
    pub fn new(path: impl Into<String>, filter: Option<FieldFilter>) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }

    /// Translate into a store query.
    pub fn to_query(&self) -> Result<CollectionQuery> {
        let mut query = CollectionQuery::new(&self.path)?;
        query.filter = self.filter.clone();
        Ok(query)
    }
}

/// A query against one collection, as understood by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionQuery {
    pub path: ResourcePath,
    pub filter: Option<FieldFilter>,
    /// Only honored by one-shot reads.
    pub limit: Option<usize>,
}

impl CollectionQuery {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self {
            path: ResourcePath::collection(path)?,
            filter: None,
            limit: None,
        })
    }

    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(fields))
    }
}

/// Operation named in a security-rule decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Get,
        Operation::List,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn is_read(self) -> bool {
        matches!(self, Operation::Get | Operation::List)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        write!(f, "{name}")
    }
}
