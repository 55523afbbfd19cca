//! Error types for the persistence core.

use writeback_storage::StorageError;

/// Errors surfaced by the write path.
///
/// Read, remove and decode failures during hydration never show up here;
/// they are absorbed by [`hydrate`](crate::hydrate::hydrate) and reported
/// through the [`PersistObserver`](crate::observer::PersistObserver).
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The backend rejected a write.
    #[error("persist write failed: {0}")]
    Write(#[from] StorageError),

    /// The state snapshot could not be serialized.
    #[error("snapshot serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}
