use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;

use recdex_core::error::{Error, Result};
use recdex_core::memory::MemoryBackend;
use recdex_core::traits::SearchBackend;
use recdex_core::types::{
    Document, FieldType, IndexingMode, Record, RecordSchema, SearchQuery, SearchResultPage,
};
use recdex_engine::{BulkConfig, IndexingCoordinator};

fn person_schema() -> RecordSchema {
    RecordSchema::new("person", "id")
        .field("id", FieldType::Int)
        .field("name", FieldType::Text)
}

fn person(id: i64, name: &str) -> Record {
    Record::new("person").with("id", json!(id)).with("name", json!(name))
}

fn coordinator(backend: &Arc<MemoryBackend>, config: BulkConfig) -> IndexingCoordinator {
    IndexingCoordinator::new(Arc::clone(backend) as Arc<dyn SearchBackend>, "records", config)
}

fn total(backend: &MemoryBackend) -> u64 {
    backend
        .search("records", &SearchQuery::match_all(), 0, 10)
        .expect("search")
        .total_hits
}

#[test]
fn submit_with_refresh_is_immediately_searchable() {
    let backend = Arc::new(MemoryBackend::new());
    let coordinator = coordinator(&backend, BulkConfig::default());
    let schema = person_schema();

    let summary = coordinator
        .submit(&[person(1, "ada"), person(2, "grace")], &schema, IndexingMode::Add, true)
        .expect("submit");
    assert_eq!(summary.accepted, 2);
    assert!(summary.rejected.is_empty());

    assert_eq!(total(&backend), 2);
    assert_eq!(backend.refresh_count(), 1, "refresh fires exactly once per barrier");

    coordinator.close(Duration::from_secs(5)).expect("close");
}

#[test]
fn submit_without_refresh_defers_visibility_to_close() {
    let backend = Arc::new(MemoryBackend::new());
    let coordinator = coordinator(&backend, BulkConfig::default());
    let schema = person_schema();

    let summary = coordinator
        .submit(&[person(1, "ada")], &schema, IndexingMode::Add, false)
        .expect("submit");
    assert_eq!(summary.accepted, 1);
    assert_eq!(backend.refresh_count(), 0, "no barrier was requested");

    coordinator.close(Duration::from_secs(5)).expect("close");
    assert_eq!(total(&backend), 1, "close drains and refreshes");
    assert_eq!(backend.refresh_count(), 1);
}

#[test]
fn update_and_delete_modes() {
    let backend = Arc::new(MemoryBackend::new());
    let coordinator = coordinator(&backend, BulkConfig::default());
    let schema = person_schema();

    coordinator
        .submit(&[person(1, "ada"), person(2, "grace")], &schema, IndexingMode::Add, true)
        .expect("add");
    coordinator
        .submit(&[person(1, "lovelace")], &schema, IndexingMode::Update, true)
        .expect("update");
    assert_eq!(total(&backend), 2, "update must not duplicate the document");
    let hits = backend
        .search("records", &SearchQuery::new("lovelace"), 0, 10)
        .expect("search");
    assert_eq!(hits.total_hits, 1);

    coordinator
        .submit(&[person(1, "lovelace")], &schema, IndexingMode::Delete, true)
        .expect("delete");
    let page = backend.search("records", &SearchQuery::match_all(), 0, 10).expect("search");
    assert_eq!(page.total_hits, 1);
    assert_eq!(page.hits[0].id, "2");

    coordinator.close(Duration::from_secs(5)).expect("close");
}

#[test]
fn conversion_failures_reject_per_record() {
    let backend = Arc::new(MemoryBackend::new());
    let coordinator = coordinator(&backend, BulkConfig::default());
    let schema = person_schema();

    let bad = Record::new("person").with("id", json!(2)).with("name", json!({"first": "g"}));
    let summary = coordinator
        .submit(&[person(1, "ada"), bad, person(3, "edsger")], &schema, IndexingMode::Add, true)
        .expect("submit");

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.rejected.len(), 1);
    let (position, err) = &summary.rejected[0];
    assert_eq!(*position, 1);
    assert!(matches!(err, Error::Conversion { .. }));

    assert_eq!(total(&backend), 2, "the rest of the batch still lands");
    coordinator.close(Duration::from_secs(5)).expect("close");
}

#[test]
fn missing_identifier_rejects_the_record() {
    let backend = Arc::new(MemoryBackend::new());
    let coordinator = coordinator(&backend, BulkConfig::default());
    let schema = person_schema();

    let summary = coordinator
        .submit(
            &[Record::new("person").with("name", json!("ada"))],
            &schema,
            IndexingMode::Delete,
            false,
        )
        .expect("submit");
    assert_eq!(summary.accepted, 0);
    assert!(matches!(summary.rejected[0].1, Error::Conversion { .. }));

    coordinator.close(Duration::from_secs(5)).expect("close");
}

/// Backend whose writes never complete.
struct StalledBackend;

impl SearchBackend for StalledBackend {
    fn index(&self, _index: &str, _doc: &Document) -> Result<()> {
        thread::sleep(Duration::from_secs(60));
        Ok(())
    }

    fn delete(&self, _index: &str, _record_type: &str, _id: &str) -> Result<()> {
        thread::sleep(Duration::from_secs(60));
        Ok(())
    }

    fn search(
        &self,
        _index: &str,
        _query: &SearchQuery,
        _from: usize,
        _size: usize,
    ) -> Result<SearchResultPage> {
        Ok(SearchResultPage { hits: Vec::new(), total_hits: 0 })
    }

    fn refresh(&self, _index: &str) -> Result<()> {
        thread::sleep(Duration::from_secs(60));
        Ok(())
    }
}

#[test]
fn close_times_out_when_the_backend_never_acknowledges() {
    let coordinator = IndexingCoordinator::new(
        Arc::new(StalledBackend),
        "records",
        BulkConfig::default(),
    );
    let schema = person_schema();

    coordinator
        .submit(&[person(1, "ada")], &schema, IndexingMode::Add, false)
        .expect("submit is accepted into the channel");

    let err = coordinator.close(Duration::from_millis(100));
    assert!(matches!(err, Err(Error::CloseTimeout(_))));
}

/// Backend that rejects every write.
struct FailingBackend;

impl SearchBackend for FailingBackend {
    fn index(&self, _index: &str, _doc: &Document) -> Result<()> {
        Err(Error::IndexUnavailable("connection reset".to_string()))
    }

    fn delete(&self, _index: &str, _record_type: &str, _id: &str) -> Result<()> {
        Err(Error::IndexUnavailable("connection reset".to_string()))
    }

    fn search(
        &self,
        _index: &str,
        _query: &SearchQuery,
        _from: usize,
        _size: usize,
    ) -> Result<SearchResultPage> {
        Ok(SearchResultPage { hits: Vec::new(), total_hits: 0 })
    }

    fn refresh(&self, _index: &str) -> Result<()> {
        Ok(())
    }
}

#[test]
fn transport_failures_surface_at_close_not_submit() {
    let coordinator = IndexingCoordinator::new(
        Arc::new(FailingBackend),
        "records",
        BulkConfig::default(),
    );
    let schema = person_schema();

    let summary = coordinator
        .submit(&[person(1, "ada")], &schema, IndexingMode::Add, false)
        .expect("submit itself succeeds");
    assert_eq!(summary.accepted, 1);

    let err = coordinator.close(Duration::from_secs(5));
    assert!(matches!(err, Err(Error::IndexUnavailable(_))));
}
