//! Error types for the Vision classroom control core.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Failed to (de)serialize value for key '{key}': {message}")]
    Serialization { key: String, message: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors surfaced by admin and student operations
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unblock request reason must not be empty")]
    EmptyReason,

    #[error("Admin code must not be empty")]
    InvalidAdminCode,

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::Io(io) => StorageError::IoError(io),
            other => StorageError::Backend(other.to_string()),
        }
    }
}
