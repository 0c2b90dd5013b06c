//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, StorageError};

/// Map domain/service errors to a one-line message for stderr.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::InvalidUrl(input) => format!("Not a URL or domain: '{}'", input),
        ApiError::StorageError(StorageError::Serialization { key, .. }) => {
            format!("Stored value for '{}' is corrupt: {}", key, e)
        }
        other => other.to_string(),
    }
}
