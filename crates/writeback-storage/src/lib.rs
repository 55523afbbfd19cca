//! Storage layer for the writeback persistence pipeline.
//!
//! The persistence core never talks to a concrete store directly. It goes
//! through the [`StorageBackend`] trait, an asynchronous string-keyed store
//! with three operations: `get`, `set` and `remove`. Any backend that can
//! implement those (a browser-style local store, a Redis client, a file) can
//! be plugged in.
//!
//! # Modules
//!
//! - [`backend`] -- The [`StorageBackend`] contract
//! - [`memory`] -- [`MemoryStorage`], the in-process reference backend
//! - [`error`] -- Shared error types

pub mod backend;
pub mod error;
pub mod memory;

// Re-export primary types for convenience.
pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::MemoryStorage;
