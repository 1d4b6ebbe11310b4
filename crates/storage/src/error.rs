use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("object s3://{bucket}/{key} is not valid UTF-8: {source}")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("object key {key:?} is not a valid store path: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: object_store::path::Error,
    },

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl StorageError {
    /// True when the object (or its bucket) does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }
}
