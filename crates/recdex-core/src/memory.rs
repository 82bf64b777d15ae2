//! In-memory backend and store implementations.
//!
//! [`MemoryBackend`] models the write-visibility contract of a real search
//! backend: accepted writes sit in a pending log until `refresh` applies
//! them, mirroring the on-disk adapter's commit cycle. Matches are ranked in
//! application order, which keeps pagination deterministic.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::traits::{RecordStore, SearchBackend};
use crate::types::{Document, Record, RecordSchema, SearchHit, SearchQuery, SearchResultPage};

#[derive(Debug, Clone)]
enum PendingOp {
    Index(Document),
    Delete { record_type: String, id: String },
}

#[derive(Debug, Default)]
struct IndexState {
    /// Committed documents, searchable, in application order.
    live: Vec<Document>,
    /// Accepted writes not yet visible.
    pending: Vec<PendingOp>,
}

#[derive(Default)]
pub struct MemoryBackend {
    indexes: Mutex<HashMap<String, IndexState>>,
    refreshes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `refresh` calls seen across all indexes.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Empty body matches everything; `field:value` compares the named source
/// field exactly; anything else is a case-insensitive substring probe over
/// scalar source values.
fn matches(doc: &Document, query: &SearchQuery) -> bool {
    let body = query.body.trim();
    if body.is_empty() {
        return true;
    }
    if let Some((field, wanted)) = body.split_once(':') {
        return doc
            .source
            .get(field)
            .and_then(value_text)
            .is_some_and(|text| text == wanted);
    }
    let needle = body.to_lowercase();
    doc.source
        .values()
        .filter_map(value_text)
        .any(|text| text.to_lowercase().contains(&needle))
}

impl SearchBackend for MemoryBackend {
    fn index(&self, index: &str, doc: &Document) -> Result<()> {
        self.indexes
            .lock()
            .entry(index.to_string())
            .or_default()
            .pending
            .push(PendingOp::Index(doc.clone()));
        Ok(())
    }

    fn delete(&self, index: &str, record_type: &str, id: &str) -> Result<()> {
        self.indexes
            .lock()
            .entry(index.to_string())
            .or_default()
            .pending
            .push(PendingOp::Delete { record_type: record_type.to_string(), id: id.to_string() });
        Ok(())
    }

    fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        from: usize,
        size: usize,
    ) -> Result<SearchResultPage> {
        if size == 0 {
            return Err(Error::Query("page size must be positive".to_string()));
        }
        let indexes = self.indexes.lock();
        let matched: Vec<&Document> = indexes
            .get(index)
            .map(|state| state.live.iter().filter(|doc| matches(doc, query)).collect())
            .unwrap_or_default();
        let total_hits = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|doc| SearchHit {
                id: doc.id.clone(),
                record_type: doc.record_type.clone(),
                score: 1.0,
            })
            .collect();
        Ok(SearchResultPage { hits, total_hits })
    }

    fn refresh(&self, index: &str) -> Result<()> {
        let mut indexes = self.indexes.lock();
        let state = indexes.entry(index.to_string()).or_default();
        let ops: Vec<PendingOp> = state.pending.drain(..).collect();
        for op in ops {
            match op {
                PendingOp::Index(doc) => {
                    state
                        .live
                        .retain(|d| !(d.record_type == doc.record_type && d.id == doc.id));
                    state.live.push(doc);
                }
                PendingOp::Delete { record_type, id } => {
                    state
                        .live
                        .retain(|d| !(d.record_type == record_type && d.id == id));
                }
            }
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory primary store keyed by (record type, identifier).
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, BTreeMap<String, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record; the identifier attribute must carry a
    /// usable value.
    pub fn insert(&self, schema: &RecordSchema, record: Record) -> Result<()> {
        let id = record.id_string(schema).ok_or_else(|| {
            Error::Operation(format!(
                "record of type '{}' has no identifier value",
                record.record_type
            ))
        })?;
        self.records
            .write()
            .entry(record.record_type.clone())
            .or_default()
            .insert(id, record);
        Ok(())
    }

    pub fn insert_all(
        &self,
        schema: &RecordSchema,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<()> {
        for record in records {
            self.insert(schema, record)?;
        }
        Ok(())
    }

    pub fn remove(&self, record_type: &str, id: &str) -> Option<Record> {
        self.records.write().get_mut(record_type)?.remove(id)
    }
}

impl RecordStore for MemoryStore {
    /// Result order is the store's internal id order, not the order of `ids`.
    fn find_all(&self, record_type: &str, ids: &[String]) -> Result<Vec<Record>> {
        let records = self.records.read();
        let Some(by_id) = records.get(record_type) else {
            return Ok(Vec::new());
        };
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(by_id
            .iter()
            .filter(|(id, _)| wanted.contains(id.as_str()))
            .map(|(_, record)| record.clone())
            .collect())
    }
}
