//! Paginated query execution and record reconstruction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use recdex_core::config::MissingRecordPolicy;
use recdex_core::error::{Error, Result};
use recdex_core::traits::{RecordStore, SearchBackend};
use recdex_core::types::{Record, RecordSchema, SearchHit, SearchQuery, SearchResultPage};

/// Issues fixed-size paginated queries against the backend.
///
/// The total-hit count reported by the first page is authoritative for the
/// whole pagination: a query is treated as a stable snapshot, and skipped or
/// duplicated hits under concurrent index mutation are an accepted
/// limitation.
#[derive(Clone)]
pub struct SearchExecutor {
    backend: Arc<dyn SearchBackend>,
    index_name: String,
    page_size: usize,
}

impl SearchExecutor {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index_name: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self { backend, index_name: index_name.into(), page_size: page_size.max(1) }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// One paginated round-trip starting at `from`.
    pub fn execute(&self, query: &SearchQuery, from: usize) -> Result<SearchResultPage> {
        self.backend.search(&self.index_name, query, from, self.page_size)
    }
}

/// Re-fetches full records for a batch of hits and restores hit order.
#[derive(Clone)]
pub struct ResultReconstructor {
    store: Arc<dyn RecordStore>,
    schemas: HashMap<String, RecordSchema>,
    policy: MissingRecordPolicy,
}

impl ResultReconstructor {
    /// `schemas` are the record types reconstruction can resolve; hits of an
    /// unregistered type are an operation error.
    pub fn new(
        store: Arc<dyn RecordStore>,
        schemas: impl IntoIterator<Item = RecordSchema>,
        policy: MissingRecordPolicy,
    ) -> Self {
        let schemas = schemas.into_iter().map(|schema| (schema.name.clone(), schema)).collect();
        Self { store, schemas, policy }
    }

    /// Group hits by record type, bulk-fetch each group with a single store
    /// call, and emit records in the exact order the hits arrived.
    ///
    /// A hit whose identifier is absent from the fetched group is index/store
    /// drift, handled per the configured [`MissingRecordPolicy`]. Duplicated
    /// hits re-emit the same record.
    pub fn reconstruct(&self, hits: &[SearchHit]) -> Result<Vec<Record>> {
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen: HashSet<(String, String)> = HashSet::with_capacity(hits.len());
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for hit in hits {
            if !seen.insert((hit.record_type.clone(), hit.id.clone())) {
                continue;
            }
            match groups.iter_mut().find(|(record_type, _)| *record_type == hit.record_type) {
                Some((_, ids)) => ids.push(hit.id.clone()),
                None => groups.push((hit.record_type.clone(), vec![hit.id.clone()])),
            }
        }

        let mut fetched: HashMap<(String, String), Record> = HashMap::with_capacity(seen.len());
        for (record_type, ids) in groups {
            let schema = self.schemas.get(&record_type).ok_or_else(|| {
                Error::Operation(format!("no schema registered for record type '{record_type}'"))
            })?;
            for record in self.store.find_all(&record_type, &ids)? {
                if let Some(id) = record.id_string(schema) {
                    fetched.insert((record_type.clone(), id), record);
                }
            }
        }

        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            match fetched.get(&(hit.record_type.clone(), hit.id.clone())) {
                Some(record) => out.push(record.clone()),
                None => match self.policy {
                    MissingRecordPolicy::Skip => {
                        tracing::warn!(
                            record_type = %hit.record_type,
                            id = %hit.id,
                            "hit not resolvable against primary store; skipping"
                        );
                    }
                    MissingRecordPolicy::Fail => {
                        return Err(Error::Reconstruction {
                            record_type: hit.record_type.clone(),
                            id: hit.id.clone(),
                        });
                    }
                },
            }
        }
        Ok(out)
    }
}
