use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot convert record of type '{record_type}': {reason}")]
    Conversion { record_type: String, reason: String },

    #[error("Search backend unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Malformed or rejected query: {0}")]
    Query(String),

    #[error("Record '{id}' of type '{record_type}' is indexed but missing from the primary store")]
    Reconstruction { record_type: String, id: String },

    #[error("Bulk channel did not drain within {0:?}; writes may be lost")]
    CloseTimeout(Duration),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
