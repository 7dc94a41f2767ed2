//! Error types for the worker.

use thiserror::Error;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that can occur while running jobs.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] lumina_queue::QueueError),

    #[error("Store error: {0}")]
    Store(#[from] lumina_store::StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] lumina_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] lumina_media::MediaError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Create a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
