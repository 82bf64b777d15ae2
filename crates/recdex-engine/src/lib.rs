//! recdex-engine
//!
//! The indexing and search-reconstruction pipelines over the core capability
//! traits: record/document conversion, asynchronous bulk submission with a
//! bounded drain-and-close protocol, paginated query execution, bulk record
//! reconstruction, and the lazy result sequence handed to callers.

pub mod convert;
pub mod indexing;
pub mod results;
pub mod search;
pub mod service;

pub use convert::DocumentConverter;
pub use indexing::{BulkConfig, IndexingCoordinator, SubmitSummary};
pub use results::SearchResultIterator;
pub use search::{ResultReconstructor, SearchExecutor};
pub use service::SearchService;
