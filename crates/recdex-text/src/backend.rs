//! Tantivy-backed implementation of the search backend capability.
//!
//! Writes buffer in the per-index writer; `refresh` commits and reloads the
//! reader, which is the visibility barrier searches observe. Indexes are
//! opened on demand and cached for the lifetime of the backend.

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, Query, QueryParser};
use tantivy::schema::Field;
use tantivy::schema::Value as _;
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term};

use recdex_core::error::{Error, Result};
use recdex_core::traits::SearchBackend;
use recdex_core::types::{Document, SearchHit, SearchQuery, SearchResultPage};

use crate::schema::{
    build_schema, doc_key, register_tokenizer, ID_FIELD, KEY_FIELD, RECORD_TYPE_FIELD,
    SOURCE_FIELD, TEXT_FIELD,
};

const DEFAULT_WRITER_MEMORY: usize = 50_000_000;

struct IndexFields {
    key: Field,
    id: Field,
    record_type: Field,
    source: Field,
    text: Field,
}

struct IndexHandle {
    index: Index,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    fields: IndexFields,
}

/// One tantivy index per backend index name, under a common root directory.
pub struct TantivyBackend {
    root_dir: PathBuf,
    writer_memory: usize,
    indexes: Mutex<HashMap<String, Arc<IndexHandle>>>,
}

impl TantivyBackend {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            writer_memory: DEFAULT_WRITER_MEMORY,
            indexes: Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-index writer heap. Tantivy enforces its own minimum.
    pub fn with_writer_memory(mut self, bytes: usize) -> Self {
        self.writer_memory = bytes;
        self
    }

    fn handle(&self, name: &str) -> Result<Arc<IndexHandle>> {
        let mut indexes = self.indexes.lock();
        if let Some(handle) = indexes.get(name) {
            return Ok(Arc::clone(handle));
        }
        let handle = self
            .open_or_create(name)
            .map_err(|e| Error::IndexUnavailable(format!("index '{name}': {e:#}")))?;
        let handle = Arc::new(handle);
        indexes.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    fn open_or_create(&self, name: &str) -> anyhow::Result<IndexHandle> {
        let dir = self.root_dir.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create index dir {}", dir.display()))?;
        let index = if dir.join("meta.json").exists() {
            Index::open_in_dir(&dir).with_context(|| format!("open index at {}", dir.display()))?
        } else {
            Index::create_in_dir(&dir, build_schema())
                .with_context(|| format!("create index at {}", dir.display()))?
        };
        register_tokenizer(&index);
        let schema = index.schema();
        let fields = IndexFields {
            key: schema.get_field(KEY_FIELD)?,
            id: schema.get_field(ID_FIELD)?,
            record_type: schema.get_field(RECORD_TYPE_FIELD)?,
            source: schema.get_field(SOURCE_FIELD)?,
            text: schema.get_field(TEXT_FIELD)?,
        };
        let writer = index.writer(self.writer_memory)?;
        let reader = index.reader()?;
        tracing::debug!(index = name, dir = %dir.display(), "opened text index");
        Ok(IndexHandle { index, writer: Mutex::new(writer), reader, fields })
    }
}

fn append_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(s);
        }
        Value::Number(n) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&n.to_string());
        }
        Value::Bool(b) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(if *b { "true" } else { "false" });
        }
        Value::Array(items) => {
            for item in items {
                append_value(out, item);
            }
        }
        Value::Null | Value::Object(_) => {}
    }
}

fn searchable_text(doc: &Document) -> String {
    let mut out = String::new();
    for value in doc.source.values() {
        append_value(&mut out, value);
    }
    out
}

impl SearchBackend for TantivyBackend {
    fn index(&self, index: &str, doc: &Document) -> Result<()> {
        let handle = self.handle(index)?;
        let fields = &handle.fields;
        let key = doc_key(&doc.record_type, &doc.id);
        let source = serde_json::to_string(&doc.source)
            .map_err(|e| Error::IndexUnavailable(format!("serialize source for '{key}': {e}")))?;
        let mut tantivy_doc = TantivyDocument::new();
        tantivy_doc.add_text(fields.key, &key);
        tantivy_doc.add_text(fields.id, &doc.id);
        tantivy_doc.add_text(fields.record_type, &doc.record_type);
        tantivy_doc.add_text(fields.source, source);
        tantivy_doc.add_text(fields.text, searchable_text(doc));
        let mut writer = handle.writer.lock();
        writer.delete_term(Term::from_field_text(fields.key, &key));
        writer
            .add_document(tantivy_doc)
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, index: &str, record_type: &str, id: &str) -> Result<()> {
        let handle = self.handle(index)?;
        let key = doc_key(record_type, id);
        let mut writer = handle.writer.lock();
        writer.delete_term(Term::from_field_text(handle.fields.key, &key));
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
        let handle = self.handle(index)?;
        let searcher = handle.reader.searcher();
        let body = query.body.trim();
        let parsed: Box<dyn Query> = if body.is_empty() {
            Box::new(AllQuery)
        } else {
            let parser = QueryParser::for_index(&handle.index, vec![handle.fields.text]);
            parser.parse_query(body).map_err(|e| Error::Query(e.to_string()))?
        };
        let (total, top_docs) = searcher
            .search(&*parsed, &(Count, TopDocs::with_limit(size).and_offset(from)))
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
            let id = doc
                .get_first(handle.fields.id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let record_type = doc
                .get_first(handle.fields.record_type)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            hits.push(SearchHit { id, record_type, score });
        }
        Ok(SearchResultPage { hits, total_hits: total as u64 })
    }

    fn refresh(&self, index: &str) -> Result<()> {
        let handle = self.handle(index)?;
        {
            let mut writer = handle.writer.lock();
            writer.commit().map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        }
        handle
            .reader
            .reload()
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        tracing::debug!(index, "index refreshed");
        Ok(())
    }
}
