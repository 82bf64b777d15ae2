//! Lazy, ordered search result sequence.

use std::collections::VecDeque;

use recdex_core::error::Result;
use recdex_core::types::{Record, SearchQuery};

use crate::search::{ResultReconstructor, SearchExecutor};

/// Forward-only, non-restartable sequence of reconstructed records.
///
/// Pages are pulled from the backend on demand and reconstructed as a batch;
/// the total-hit count of the first page bounds the pagination. Yielding an
/// error fuses the iterator. A single instance must not be advanced from
/// multiple threads; independent instances are fine.
pub struct SearchResultIterator {
    executor: SearchExecutor,
    reconstructor: ResultReconstructor,
    query: SearchQuery,
    offset: usize,
    total: Option<u64>,
    buffer: VecDeque<Record>,
    done: bool,
}

impl SearchResultIterator {
    pub(crate) fn new(
        executor: SearchExecutor,
        reconstructor: ResultReconstructor,
        query: SearchQuery,
    ) -> Self {
        Self {
            executor,
            reconstructor,
            query,
            offset: 0,
            total: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Total hits reported by the backend; known once the first page has been
    /// fetched.
    pub fn total_hits(&self) -> Option<u64> {
        self.total
    }

    /// Pull pages until the buffer holds records or the sequence is
    /// exhausted. Returns whether the buffer is non-empty.
    fn fill_buffer(&mut self) -> Result<bool> {
        loop {
            if let Some(total) = self.total {
                if self.offset as u64 >= total {
                    return Ok(false);
                }
            }
            let page = self.executor.execute(&self.query, self.offset)?;
            // the first page's total wins; later pages must agree and
            // re-query drift is an accepted limitation
            let total = *self.total.get_or_insert(page.total_hits);
            if page.hits.is_empty() {
                if (self.offset as u64) < total {
                    tracing::warn!(
                        offset = self.offset,
                        total,
                        "backend returned a short page; ending sequence early"
                    );
                }
                self.total = Some(self.offset as u64);
                return Ok(false);
            }
            self.offset += page.hits.len();
            let records = self.reconstructor.reconstruct(&page.hits)?;
            if !records.is_empty() {
                self.buffer.extend(records);
                return Ok(true);
            }
            // the whole page was skipped as drift; advance to the next one
        }
    }
}

impl Iterator for SearchResultIterator {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(record) = self.buffer.pop_front() {
            return Some(Ok(record));
        }
        match self.fill_buffer() {
            Ok(true) => self.buffer.pop_front().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
