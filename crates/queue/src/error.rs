//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("acknowledge error: {0}")]
    Ack(String),

    #[error("queue not found: {0}")]
    NotFound(String),
}
