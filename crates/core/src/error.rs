use thiserror::Error;

/// Reasons a feature document is rejected as a whole.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("unsupported document type: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnsupportedDocumentType(Option<String>),

    #[error("feature #{index} has no geometry")]
    MissingGeometry { index: usize },

    #[error("feature #{index} has non-object properties")]
    InvalidProperties { index: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
