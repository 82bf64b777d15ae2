//! Domain types shared by the indexing and search pipelines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub type RecordType = String;
pub type FieldValues = HashMap<String, Value>;

/// Reserved source key carrying the record type tag inside a document, so the
/// original record type can always be recovered from a bare document.
pub const TYPE_FIELD: &str = "type";

/// Canonical string form of an identifier value.
///
/// Strings pass through, numbers use their decimal form; other value kinds
/// have no identifier form.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field kinds a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Keyword,
    Int,
    Float,
    Bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

/// Declares a record type's identifier attribute and field types.
/// Immutable once obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: RecordType,
    pub id_attribute: String,
    pub fields: Vec<FieldDef>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        Self { name: name.into(), id_attribute: id_attribute.into(), fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef { name: name.into(), field_type });
        self
    }
}

/// A primary-store entity: a type tag plus named field values. Records are
/// owned by the store; the pipelines only borrow them for conversion and
/// clone them during reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_type: RecordType,
    pub values: FieldValues,
}

impl Record {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self { record_type: record_type.into(), values: HashMap::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn id_value(&self, schema: &RecordSchema) -> Option<&Value> {
        self.values.get(&schema.id_attribute)
    }

    /// Canonical identifier of this record under `schema`, if present.
    pub fn id_string(&self, schema: &RecordSchema) -> Option<String> {
        self.id_value(schema).and_then(id_string)
    }
}

/// The index-side representation of a record: a source field map plus the
/// embedded type tag and identifier.
///
/// `id` always equals the canonical string form of the record's identifier
/// attribute, and `source` always carries the type tag under [`TYPE_FIELD`].
/// Documents exist only for the duration of an indexing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub record_type: RecordType,
    pub source: serde_json::Map<String, Value>,
}

/// Opaque query body handed through to the backend. Parsing and ranking are
/// the backend's concern; an empty body matches all documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub body: String,
}

impl SearchQuery {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn match_all() -> Self {
        Self::default()
    }
}

/// A query result reference in backend relevance order. Carries only the
/// reconstruction keys, never full field data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub record_type: RecordType,
    pub score: f32,
}

/// One page of backend results: hits in relevance order plus the query's
/// total hit count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub hits: Vec<SearchHit>,
    pub total_hits: u64,
}

/// Caller intent for an indexing submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingMode {
    Add,
    Update,
    Delete,
}

/// Backend-facing write operation derived from an [`IndexingMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudType {
    Insert,
    Upsert,
    Remove,
}

impl IndexingMode {
    pub fn crud_type(self) -> CrudType {
        match self {
            IndexingMode::Add => CrudType::Insert,
            IndexingMode::Update => CrudType::Upsert,
            IndexingMode::Delete => CrudType::Remove,
        }
    }
}
