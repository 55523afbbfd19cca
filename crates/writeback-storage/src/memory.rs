//! In-process reference backend.
//!
//! [`MemoryStorage`] keeps the last value set for each key in a map guarded
//! by an async mutex. It is the default backend when none is configured and
//! the reference for how a backend is expected to behave:
//!
//! | Operation | Missing key | Present key |
//! |-----------|-------------|-------------|
//! | `get` | `Ok(None)` | `Ok(Some(value))` |
//! | `set` | stores, `Ok(value)` | overwrites, `Ok(value)` |
//! | `remove` | `Ok(None)` | deletes, `Ok(Some(previous))` |
//!
//! Every operation yields to the scheduler before touching the map, so no
//! call ever completes on its first poll. There is no real latency, but
//! callers cannot come to rely on storage being synchronous.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// In-memory [`StorageBackend`].
///
/// Cloning is cheap and clones share the same entries, which lets a test
/// hand one clone to the persistence core and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Copy of every stored entry, in key order.
    pub async fn entries(&self) -> BTreeMap<String, String> {
        self.entries.lock().await.clone()
    }
}

impl StorageBackend for MemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let value = self.entries.lock().await.get(key).cloned();
            tracing::trace!(key, hit = value.is_some(), "memory storage get");
            Ok(value)
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, Result<String, StorageError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.entries
                .lock()
                .await
                .insert(key.to_owned(), value.clone());
            tracing::trace!(key, bytes = value.len(), "memory storage set");
            Ok(value)
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let previous = self.entries.lock().await.remove(key);
            tracing::trace!(key, existed = previous.is_some(), "memory storage remove");
            Ok(previous)
        })
    }
}
