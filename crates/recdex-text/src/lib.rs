//! recdex-text
//!
//! Tantivy-backed [`recdex_core::traits::SearchBackend`] adapter: one on-disk
//! index per backend index name under a common root directory. See `schema`
//! for the field layout.

pub mod backend;
pub mod schema;

pub use backend::TantivyBackend;
