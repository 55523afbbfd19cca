//! Error types for the demo binary.
//!
//! [`DemoError`] wraps every failure mode of the demo so `main` can
//! propagate with `?`.

use writeback_core::config::ConfigError;
use writeback_core::{DispatchError, PersistError, StorageError};

/// Top-level error for the demo binary.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Settings could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Persisting state failed.
    #[error("persist error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },

    /// A direct storage call failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: StorageError,
    },

    /// The hydration callback never reported back.
    #[error("hydration error: {message}")]
    Hydration {
        /// Description of the hydration failure.
        message: String,
    },

    /// The store rejected an action.
    #[error("invalid action: {message}")]
    InvalidAction {
        /// Why the action was rejected.
        message: String,
    },
}

impl From<DispatchError<Self>> for DemoError {
    fn from(err: DispatchError<Self>) -> Self {
        match err {
            DispatchError::Action(action_err) => action_err,
            DispatchError::Persist(source) => Self::Persist { source },
        }
    }
}
