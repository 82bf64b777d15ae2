use crate::error::Result;
use crate::types::{Document, Record, SearchQuery, SearchResultPage};

/// Narrow capability surface of the search backend. Every call is a blocking
/// request/response round-trip; visibility of accepted writes is governed by
/// `refresh`.
pub trait SearchBackend: Send + Sync {
    /// Upsert one document into `index`, keyed by (type tag, id).
    fn index(&self, index: &str, doc: &Document) -> Result<()>;

    /// Remove the document keyed by (type tag, id) from `index`.
    fn delete(&self, index: &str, record_type: &str, id: &str) -> Result<()>;

    /// One paginated query round-trip. `total_hits` reflects the full match
    /// count regardless of `from`/`size`.
    fn search(&self, index: &str, query: &SearchQuery, from: usize, size: usize)
        -> Result<SearchResultPage>;

    /// Make all previously accepted writes visible to subsequent searches.
    fn refresh(&self, index: &str) -> Result<()>;
}

/// Bulk batch-fetch-by-id service of the primary record store.
pub trait RecordStore: Send + Sync {
    /// Fetch all records of `record_type` whose identifier is in `ids`.
    /// Result order is not guaranteed to match `ids`; absent identifiers are
    /// silently omitted.
    fn find_all(&self, record_type: &str, ids: &[String]) -> Result<Vec<Record>>;
}
