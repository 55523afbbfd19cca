//! Error types for the storage layer.
//!
//! Every backend reports failures through [`StorageError`], tagged with the
//! operation that failed and the key it was addressing.

/// Errors that a [`StorageBackend`](crate::StorageBackend) can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Reading a key failed.
    #[error("storage read failed for {key}: {message}")]
    Read {
        /// The key being read.
        key: String,
        /// Backend-specific description of the failure.
        message: String,
    },

    /// Writing a key failed.
    #[error("storage write failed for {key}: {message}")]
    Write {
        /// The key being written.
        key: String,
        /// Backend-specific description of the failure.
        message: String,
    },

    /// Removing a key failed.
    #[error("storage remove failed for {key}: {message}")]
    Remove {
        /// The key being removed.
        key: String,
        /// Backend-specific description of the failure.
        message: String,
    },

    /// The backend cannot serve requests at all.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// The key the failed operation addressed, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Read { key, .. } | Self::Write { key, .. } | Self::Remove { key, .. } => {
                Some(key.as_str())
            }
            Self::Unavailable(_) => None,
        }
    }
}
