use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Storage unavailable for key {key}: {reason}")]
    Storage { key: String, reason: String },

    #[error("Storage file {path} could not be used: {source}")]
    StorageFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Transport channel closed")]
    TransportClosed,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
