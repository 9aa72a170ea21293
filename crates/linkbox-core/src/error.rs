use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("owner id cannot be empty")]
    EmptyOwner,
}

/// Errors returned by [`Registry`](crate::Registry) implementations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The (original url, owner) pair is already registered.
    #[error("url already registered for owner: {0}")]
    Conflict(String),
    /// The candidate short code is held by another record.
    #[error("short code already taken: {0}")]
    CodeTaken(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage io failed: {0}")]
    Io(String),
    #[error("snapshot serialization failed: {0}")]
    Serialization(String),
    #[error("storage is closed")]
    Closed,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
