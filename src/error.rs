use std::time::Duration;

use thiserror::Error;

/// Failures raised by a `RecordStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend itself failed (connection, protocol, decoding).
    #[error("record store backend error: {0}")]
    Backend(String),

    /// The query could not be expressed against the backend.
    #[error("invalid record store query: {0}")]
    Query(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The request-scoped deadline elapsed before every read returned.
    #[error("record store request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors surfaced by claim resolution and aggregation.
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no claim found for {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
