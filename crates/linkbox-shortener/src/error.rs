use linkbox_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("batch is empty")]
    EmptyBatch,
    #[error("unknown short code: {0}")]
    NotFound(String),
    #[error("short code was deleted: {0}")]
    Gone(String),
    #[error("no free short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
    #[error("deletion task failed: {0}")]
    Deletion(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
