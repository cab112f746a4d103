//! Error types for the AgriSense domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all AgriSense operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Sensor device errors ---
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    // --- Completion provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the sensor device.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Device returned status {status_code}")]
    BadStatus { status_code: u16 },

    #[error("Unreadable device payload: {0}")]
    Payload(String),
}

/// Failures talking to the completion provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Failures in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn device_error_converts_to_top_level() {
        let err: Error = DeviceError::BadStatus { status_code: 503 }.into();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn store_error_displays_reason() {
        let err = Error::Store(StoreError::QueryFailed("no such table".into()));
        assert!(err.to_string().contains("no such table"));
    }
}
