use thiserror::Error;
use vinyl_core::VinylError;

use crate::crypto::CryptoError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the storage gateway and its backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unsupported media type: {detected}")]
    UnsupportedMediaType { detected: String },

    #[error("Object not found: {id}")]
    NotFound { id: String },

    #[error("Object {id} belongs to another user")]
    Forbidden { id: String },

    #[error("Storage backend {operation} failed: {source}")]
    BackendFailure {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("Object index error: {message}")]
    Index { message: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl StorageError {
    /// Wrap a backend-specific failure
    pub fn backend<E>(operation: &'static str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendFailure {
            operation,
            source: Box::new(error),
        }
    }

    /// Backend failure described only by a message
    pub fn backend_msg<S: Into<String>>(operation: &'static str, message: S) -> Self {
        Self::BackendFailure {
            operation,
            source: message.into().into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn forbidden<S: Into<String>>(id: S) -> Self {
        Self::Forbidden { id: id.into() }
    }

    pub fn index<S: Into<String>>(message: S) -> Self {
        Self::Index {
            message: message.into(),
        }
    }

    /// Whether a caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::BackendFailure { .. })
    }
}

impl From<StorageError> for VinylError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::UnsupportedMediaType { detected } => VinylError::unsupported_media(message)
                .with_data(serde_json::json!({ "detected": detected })),
            StorageError::NotFound { .. } => VinylError::not_found(message),
            StorageError::Forbidden { .. } => VinylError::forbidden(message),
            StorageError::BackendFailure { operation, source } => {
                VinylError::unavailable(format!("Storage backend {operation} failed"))
                    .with_data(serde_json::json!({ "retryable": true }))
                    .with_source(anyhow::anyhow!(source))
            }
            StorageError::Invalid { .. } => VinylError::bad_request(message),
            StorageError::TooLarge { .. } => VinylError::payload_too_large(message),
            StorageError::Index { .. } => VinylError::general_error("Object index unavailable"),
            StorageError::Crypto(crypto) => VinylError::general_error("Stored object could not be decrypted")
                .with_source(crypto),
        }
    }
}
