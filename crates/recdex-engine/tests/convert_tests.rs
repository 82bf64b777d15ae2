use serde_json::json;

use recdex_core::error::Error;
use recdex_core::types::{FieldType, Record, RecordSchema, TYPE_FIELD};
use recdex_engine::DocumentConverter;

fn book_schema() -> RecordSchema {
    RecordSchema::new("book", "isbn")
        .field("isbn", FieldType::Keyword)
        .field("title", FieldType::Text)
        .field("pages", FieldType::Int)
        .field("tags", FieldType::Keyword)
}

#[test]
fn document_carries_id_and_type_tag() {
    let converter = DocumentConverter::new();
    let schema = book_schema();
    let record = Record::new("book")
        .with("isbn", json!("978-3"))
        .with("title", json!("Structured Programming"))
        .with("pages", json!(220))
        .with("tags", json!(["classic", "cs"]))
        .with("shelf", json!("A4"));

    let doc = converter.to_document(&record, &schema).expect("convert");
    assert_eq!(doc.id, "978-3");
    assert_eq!(doc.record_type, "book");
    assert_eq!(doc.source.get(TYPE_FIELD), Some(&json!("book")));
    assert_eq!(doc.source.get("title"), Some(&json!("Structured Programming")));
    assert_eq!(doc.source.get("tags"), Some(&json!(["classic", "cs"])));
    assert!(doc.source.get("shelf").is_none(), "undeclared fields are not serialized");
}

#[test]
fn numeric_identifiers_canonicalize_to_strings() {
    let converter = DocumentConverter::new();
    let schema = RecordSchema::new("order", "id").field("id", FieldType::Int);
    let record = Record::new("order").with("id", json!(1001));
    let doc = converter.to_document(&record, &schema).expect("convert");
    assert_eq!(doc.id, "1001");
}

#[test]
fn incompatible_field_values_fail_conversion() {
    let converter = DocumentConverter::new();
    let schema = book_schema();
    let record = Record::new("book")
        .with("isbn", json!("978-3"))
        .with("pages", json!({"count": 220}));

    let err = converter.to_document(&record, &schema);
    assert!(matches!(err, Err(Error::Conversion { ref record_type, .. }) if record_type == "book"));
}

#[test]
fn missing_identifier_fails_conversion() {
    let converter = DocumentConverter::new();
    let schema = book_schema();
    let record = Record::new("book").with("title", json!("Untitled"));
    assert!(matches!(converter.to_document(&record, &schema), Err(Error::Conversion { .. })));
}

#[test]
fn bare_documents_map_back_to_records() {
    let converter = DocumentConverter::new();
    let schema = book_schema();
    let record = Record::new("book")
        .with("isbn", json!("978-3"))
        .with("title", json!("Structured Programming"))
        .with("pages", json!(220));

    let doc = converter.to_document(&record, &schema).expect("convert");
    let back = converter.to_record(&doc, &schema).expect("reverse");
    assert_eq!(back.record_type, "book");
    assert_eq!(back.get("isbn"), Some(&json!("978-3")));
    assert_eq!(back.get("title"), Some(&json!("Structured Programming")));
    assert_eq!(back.get("pages"), Some(&json!(220)));
    assert!(back.get(TYPE_FIELD).is_none(), "the tag stays in the document");
}
