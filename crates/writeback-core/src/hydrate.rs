//! Hydrate-or-reset bootstrap.
//!
//! At startup the persisted record is read back and merged over an initial
//! state. A storage entry that cannot be read is presumed corrupt: it is
//! removed and hydration falls back to an empty state, so a broken entry
//! never blocks startup.
//!
//! ```text
//! get(persist:key)
//!   |-- Err  --> remove(persist:key) --> {}            (remove error kept
//!   |                                                   in cleanup_error)
//!   +-- Ok(None)        --> initial
//!   +-- Ok(Some(raw))   --> decode --> initial <- decoded fields
//!                             +-- malformed --> initial
//! ```
//!
//! Hydration only computes a state. Installing it into the host container
//! is up to the caller.

use serde_json::{Map, Value};
use writeback_storage::StorageError;

use crate::codec;
use crate::config::PersistConfig;
use crate::observer::PersistEvent;

/// Outcome of [`hydrate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hydration {
    /// The hydrated state.
    pub state: Map<String, Value>,

    /// Set when the read failed and removing the corrupt entry failed too.
    /// Hydration still succeeded with an empty state.
    pub cleanup_error: Option<StorageError>,
}

/// Read the persisted snapshot and merge it over `initial`.
///
/// Fields from the persisted record replace fields of the same name in
/// `initial`; the merge is shallow. Never fails: every storage or decode
/// problem degrades to "nothing persisted" and is reported to the
/// configured observer.
pub async fn hydrate(initial: Map<String, Value>, config: &PersistConfig) -> Hydration {
    let key = config.storage_key();
    let observer = config.observer();

    let raw = match config.storage().get(&key).await {
        Ok(raw) => raw,
        Err(error) => {
            observer.on_event(&PersistEvent::ReadFailed {
                key: key.clone(),
                error,
            });
            let cleanup_error = match config.storage().remove(&key).await {
                Ok(_) => {
                    observer.on_event(&PersistEvent::CorruptEntryRemoved { key: key.clone() });
                    None
                }
                Err(error) => {
                    observer.on_event(&PersistEvent::RemoveFailed {
                        key: key.clone(),
                        error: error.clone(),
                    });
                    Some(error)
                }
            };
            observer.on_event(&PersistEvent::Hydrated {
                key,
                restored_fields: 0,
            });
            return Hydration {
                state: Map::new(),
                cleanup_error,
            };
        }
    };

    let restored = raw.map_or_else(Map::new, |raw| match codec::decode(&raw) {
        Ok(fields) => fields,
        Err(e) => {
            observer.on_event(&PersistEvent::DecodeFailed {
                key: key.clone(),
                message: e.to_string(),
            });
            Map::new()
        }
    });

    let restored_fields = restored.len();
    let mut state = initial;
    state.extend(restored);

    observer.on_event(&PersistEvent::Hydrated {
        key,
        restored_fields,
    });

    Hydration {
        state,
        cleanup_error: None,
    }
}
