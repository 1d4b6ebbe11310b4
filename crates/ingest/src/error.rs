use thiserror::Error;

use geoingest_core::DocumentError;
use geoingest_queue::ObjectTarget;
use geoingest_storage::StorageError;

use crate::writer::WriteError;

/// Failure of one queue message. The message is left for redelivery.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("message body is not a valid notification: {0}")]
    MessageBody(#[source] serde_json::Error),

    #[error("failed to fetch {target}: {source}")]
    Fetch {
        target: ObjectTarget,
        #[source]
        source: StorageError,
    },

    #[error("invalid GeoJSON in {target}: {source}")]
    Document {
        target: ObjectTarget,
        #[source]
        source: DocumentError,
    },

    #[error("failed to persist features from {target}: {source}")]
    Write {
        target: ObjectTarget,
        #[source]
        source: WriteError,
    },
}

impl IngestError {
    /// True for content problems that redelivery alone will not fix.
    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::MessageBody(_) | IngestError::Document { .. })
    }
}
