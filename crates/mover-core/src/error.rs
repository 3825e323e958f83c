//! Error types for mover

use thiserror::Error;

/// Workspace error type. Variants map one-to-one onto the failure classes the
/// engine distinguishes: everything except `Download` aborts the running verb.
#[derive(Error, Debug)]
pub enum MoverError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("load error: {0}")]
    Load(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download error: {0}")]
    Download(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cancelled")]
    Cancelled,
}

/// Result type alias for mover operations
pub type Result<T> = std::result::Result<T, MoverError>;
