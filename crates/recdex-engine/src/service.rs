//! Facade combining the indexing and search pipelines.

use std::sync::Arc;
use std::time::Duration;

use recdex_core::config::EngineConfig;
use recdex_core::error::Result;
use recdex_core::traits::{RecordStore, SearchBackend};
use recdex_core::types::{IndexingMode, Record, RecordSchema, SearchQuery};

use crate::indexing::{BulkConfig, IndexingCoordinator, SubmitSummary};
use crate::results::SearchResultIterator;
use crate::search::{ResultReconstructor, SearchExecutor};

/// Keeps the primary store and the search index in sync and answers queries
/// with fully reconstructed records in index order.
pub struct SearchService {
    coordinator: IndexingCoordinator,
    executor: SearchExecutor,
    reconstructor: ResultReconstructor,
    close_timeout: Duration,
}

impl SearchService {
    /// Build the service around injected backend and store handles. `schemas`
    /// are the record types reconstruction can resolve.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn RecordStore>,
        schemas: impl IntoIterator<Item = RecordSchema>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let coordinator = IndexingCoordinator::new(
            Arc::clone(&backend),
            config.index_name.clone(),
            BulkConfig::from(config),
        );
        let executor = SearchExecutor::new(backend, config.index_name.clone(), config.page_size);
        let reconstructor = ResultReconstructor::new(store, schemas, config.on_missing);
        Ok(Self { coordinator, executor, reconstructor, close_timeout: config.close_timeout() })
    }

    /// Index records with read-after-write visibility (refresh implied).
    pub fn index(
        &self,
        records: &[Record],
        schema: &RecordSchema,
        mode: IndexingMode,
    ) -> Result<SubmitSummary> {
        self.coordinator.submit(records, schema, mode, true)
    }

    /// Enqueue records without waiting for visibility.
    pub fn submit(
        &self,
        records: &[Record],
        schema: &RecordSchema,
        mode: IndexingMode,
        refresh: bool,
    ) -> Result<SubmitSummary> {
        self.coordinator.submit(records, schema, mode, refresh)
    }

    /// Lazy, ordered sequence of reconstructed records for `query`. Each call
    /// returns an independent single-pass iterator.
    pub fn search(&self, query: SearchQuery) -> SearchResultIterator {
        SearchResultIterator::new(self.executor.clone(), self.reconstructor.clone(), query)
    }

    /// Read-after-write barrier on the backend index.
    pub fn refresh(&self) -> Result<()> {
        self.coordinator.refresh()
    }

    /// Drain pending writes with the configured bounded wait.
    pub fn close(self) -> Result<()> {
        let timeout = self.close_timeout;
        self.coordinator.close(timeout)
    }

    /// Drain pending writes, bounded by `timeout`.
    pub fn close_within(self, timeout: Duration) -> Result<()> {
        self.coordinator.close(timeout)
    }
}
