//! Record ↔ document mapping.

use serde_json::{Map, Value};

use recdex_core::error::{Error, Result};
use recdex_core::types::{Document, FieldDef, FieldType, Record, RecordSchema, TYPE_FIELD};

/// Pure, stateless mapper between primary-store records and index documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentConverter;

impl DocumentConverter {
    pub fn new() -> Self {
        Self
    }

    /// Canonical identifier of `record` under `schema`; a missing or unusable
    /// identifier value is a conversion failure.
    pub fn identifier(&self, record: &Record, schema: &RecordSchema) -> Result<String> {
        record.id_string(schema).ok_or_else(|| {
            conversion(
                schema,
                format!("identifier attribute '{}' has no usable value", schema.id_attribute),
            )
        })
    }

    /// Map a record to its index document.
    ///
    /// Only declared fields are serialized. The document id is the canonical
    /// string form of the identifier attribute, and the source carries the
    /// type tag under [`TYPE_FIELD`].
    pub fn to_document(&self, record: &Record, schema: &RecordSchema) -> Result<Document> {
        let id = self.identifier(record, schema)?;
        let mut source = Map::with_capacity(schema.fields.len() + 2);
        if let Some(value) = record.get(&schema.id_attribute) {
            source.insert(schema.id_attribute.clone(), value.clone());
        }
        for field in &schema.fields {
            let Some(value) = record.get(&field.name) else { continue };
            check_field(field, value).map_err(|reason| conversion(schema, reason))?;
            source.insert(field.name.clone(), value.clone());
        }
        source.insert(TYPE_FIELD.to_string(), Value::String(record.record_type.clone()));
        Ok(Document { id, record_type: record.record_type.clone(), source })
    }

    /// Map a bare document back to a record. Only used when the primary store
    /// is bypassed; the search path re-fetches full records instead of
    /// trusting the possibly-partial source.
    pub fn to_record(&self, document: &Document, schema: &RecordSchema) -> Result<Record> {
        let mut record = Record::new(document.record_type.clone());
        if let Some(value) = document.source.get(&schema.id_attribute) {
            record.set(schema.id_attribute.clone(), value.clone());
        }
        for field in &schema.fields {
            if field.name == schema.id_attribute {
                continue;
            }
            if let Some(value) = document.source.get(&field.name) {
                record.set(field.name.clone(), value.clone());
            }
        }
        Ok(record)
    }
}

fn conversion(schema: &RecordSchema, reason: String) -> Error {
    Error::Conversion { record_type: schema.name.clone(), reason }
}

/// A declared field accepts null, a matching scalar, or an array of matching
/// scalars.
fn check_field(field: &FieldDef, value: &Value) -> std::result::Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                check_scalar(field, item)?;
            }
            Ok(())
        }
        other => check_scalar(field, other),
    }
}

fn check_scalar(field: &FieldDef, value: &Value) -> std::result::Result<(), String> {
    let ok = match field.field_type {
        FieldType::Text | FieldType::Keyword => value.is_string(),
        FieldType::Int => value.is_i64() || value.is_u64(),
        FieldType::Float => value.is_number(),
        FieldType::Bool => value.is_boolean(),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("field '{}' is not {:?}-compatible: {value}", field.name, field.field_type))
    }
}
