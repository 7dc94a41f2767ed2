//! Queue error types.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while talking to the job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue configuration error: {0}")]
    ConfigError(String),

    #[error("Queue request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Queue RPC {rpc} returned {status}: {body}")]
    Api {
        rpc: String,
        status: u16,
        body: String,
    },

    #[error("Invalid queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl QueueError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn api(rpc: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            rpc: rpc.into(),
            status,
            body: body.into(),
        }
    }
}
