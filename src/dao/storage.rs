use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by document store backends regardless of the underlying
/// database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A merge-style write targeted a document that does not exist.
    ///
    /// Reads of absent documents are `Ok(None)`; only partial updates
    /// surface the miss, so callers can fall back to a full set.
    #[error("document `{collection}/{id}` does not exist")]
    MissingDocument {
        /// Collection the write targeted.
        collection: String,
        /// Identifier of the missing document.
        id: String,
    },
    /// A stored payload could not be converted into the expected shape.
    #[error("failed to decode document payload: {message}")]
    Decode {
        /// Human readable description of the failure.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a missing-document error for a merge write.
    pub fn missing(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StorageError::MissingDocument {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Construct a decode error from a conversion failure.
    pub fn decode(message: impl Into<String>) -> Self {
        StorageError::Decode {
            message: message.into(),
        }
    }
}
