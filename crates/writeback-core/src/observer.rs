//! Diagnostic events for the persistence pipeline.
//!
//! Several failures never reach a caller: a corrupt entry is removed and
//! startup continues, a malformed record is treated as empty, and a debounced
//! write that fails has no caller left to tell. Each of those is still
//! reported as a [`PersistEvent`] to the configured [`PersistObserver`], so
//! integrators can alert on them and tests can assert on them.

use std::time::Duration;

use tracing::{debug, warn};
use writeback_storage::StorageError;

/// Something the persistence pipeline did or absorbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistEvent {
    /// Hydration finished and produced a state.
    Hydrated {
        /// Namespaced storage key.
        key: String,
        /// Number of fields contributed by the persisted record.
        restored_fields: usize,
    },

    /// Reading the persisted record failed; the entry will be removed.
    ReadFailed {
        /// Namespaced storage key.
        key: String,
        /// The backend error.
        error: StorageError,
    },

    /// The presumed-corrupt entry was removed after a failed read.
    CorruptEntryRemoved {
        /// Namespaced storage key.
        key: String,
    },

    /// Removing the presumed-corrupt entry failed as well.
    RemoveFailed {
        /// Namespaced storage key.
        key: String,
        /// The backend error.
        error: StorageError,
    },

    /// The persisted record could not be decoded and was ignored.
    DecodeFailed {
        /// Namespaced storage key.
        key: String,
        /// Description of the decode failure.
        message: String,
    },

    /// A debounced write was scheduled.
    WriteScheduled {
        /// Namespaced storage key.
        key: String,
        /// Delay before the write fires.
        delay: Duration,
        /// Whether an unfired write was cancelled to make room.
        replaced_pending: bool,
    },

    /// A snapshot reached storage.
    WriteCompleted {
        /// Namespaced storage key.
        key: String,
        /// Size of the persisted record.
        bytes: usize,
    },

    /// A write was rejected by the backend.
    WriteFailed {
        /// Namespaced storage key.
        key: String,
        /// The backend error.
        error: StorageError,
        /// `true` when the write came from the debounce timer, i.e. no
        /// caller observed the failure.
        debounced: bool,
    },
}

/// Receiver for [`PersistEvent`]s.
///
/// Called inline from the pipeline, including from timer tasks, so
/// implementations should return quickly.
pub trait PersistObserver: Send + Sync {
    /// Called for every event.
    fn on_event(&self, event: &PersistEvent);
}

/// Logs every event through `tracing`. The default observer.
///
/// Absorbed failures are logged at `warn`, routine activity at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PersistObserver for TracingObserver {
    fn on_event(&self, event: &PersistEvent) {
        match event {
            PersistEvent::Hydrated {
                key,
                restored_fields,
            } => debug!(key, restored_fields, "State hydrated"),
            PersistEvent::ReadFailed { key, error } => {
                warn!(key, %error, "Persisted state unreadable, resetting");
            }
            PersistEvent::CorruptEntryRemoved { key } => {
                debug!(key, "Removed unreadable persisted entry");
            }
            PersistEvent::RemoveFailed { key, error } => {
                warn!(key, %error, "Failed to remove unreadable persisted entry");
            }
            PersistEvent::DecodeFailed { key, message } => {
                warn!(key, reason = message.as_str(), "Persisted state malformed, ignoring");
            }
            PersistEvent::WriteScheduled {
                key,
                delay,
                replaced_pending,
            } => debug!(
                key,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                replaced_pending,
                "Write scheduled"
            ),
            PersistEvent::WriteCompleted { key, bytes } => {
                debug!(key, bytes, "State persisted");
            }
            PersistEvent::WriteFailed {
                key,
                error,
                debounced,
            } => warn!(key, %error, debounced, "Failed to persist state"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl PersistObserver for NoOpObserver {
    fn on_event(&self, _event: &PersistEvent) {}
}
