//! Unified error types for docshelf.
//!
//! The public cache API never surfaces these to interactive callers; they
//! flow through the internal `try_*` paths and end up in a log line.

use tokio_rusqlite::rusqlite;

/// Unified error type for the cache and its storage backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A blob or metadata store reported a failure.
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Metadata record could not be (de)serialized.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A derived form could not be decoded back to bytes.
    #[error("DECODE_ERROR: {0}")]
    Decode(String),

    /// The cache was used after `close()`.
    #[error("CACHE_CLOSED")]
    Closed,

    /// Invalid input parameters (e.g., empty document id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
