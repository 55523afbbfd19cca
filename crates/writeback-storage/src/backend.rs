//! The asynchronous key-value contract consumed by the persistence core.
//!
//! A [`StorageBackend`] stores opaque strings under string keys. Every
//! operation completes asynchronously and reports either a value or a
//! [`StorageError`]. Callers must treat every backend as potentially latent,
//! even ones with no real I/O.
//!
//! Operations return boxed futures so the trait stays object safe: the core
//! holds its backend as `Arc<dyn StorageBackend>` and moves clones of it into
//! spawned write tasks.
//!
//! # Ordering
//!
//! No ordering is assumed between concurrent calls. A backend must tolerate
//! `set` calls for the same key completing out of order; the last completed
//! write wins and no sequence token is attached.

use futures::future::BoxFuture;

use crate::error::StorageError;

/// An asynchronous string-keyed store.
///
/// Implementations must be shareable across tasks. `get` and `remove` on a
/// missing key succeed with `None` rather than failing.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend could not perform the read.
    /// A missing key is not an error.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>>;

    /// Store `value` at `key`, overwriting anything already there.
    ///
    /// Resolves with the value that was stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write did not happen.
    fn set<'a>(&'a self, key: &'a str, value: String)
    -> BoxFuture<'a, Result<String, StorageError>>;

    /// Delete `key`, resolving with the value it held before, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend could not perform the delete.
    /// A missing key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>>;
}
