//! Debounced write-back persistence for in-memory application state.
//!
//! On startup the persistor hydrates state from a [`StorageBackend`]; after
//! every dispatched action it writes a (filtered) snapshot of the current
//! state back, optionally coalescing bursts of actions into a single delayed
//! write.
//!
//! # Architecture
//!
//! ```text
//! host dispatch
//!     |
//!     +-- PersistMiddleware::dispatch
//!         |-- next(action)                  (host handler runs first)
//!         +-- WriteCoalescer::trigger
//!             |-- read current state
//!             |-- codec::encode             (drop ignore_keys)
//!             +-- StorageBackend::set       (now, or after the debounce)
//!
//! startup
//!     |
//!     +-- hydrate()  --> get / decode / merge, remove on read failure
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Settings loading (YAML + env) and the runtime [`PersistConfig`]
//! - [`codec`] -- Snapshot encoding with top-level field omission
//! - [`hydrate`] -- Hydrate-or-reset bootstrap
//! - [`coalescer`] -- Debounced, single-pending write scheduling
//! - [`middleware`] -- Dispatch adapter that drives the coalescer
//! - [`observer`] -- Diagnostic events for otherwise-silent failures
//! - [`persistor`] -- The installer entry point
//! - [`error`] -- Shared error types
//!
//! [`StorageBackend`]: writeback_storage::StorageBackend

pub mod coalescer;
pub mod codec;
pub mod config;
pub mod error;
pub mod hydrate;
pub mod middleware;
pub mod observer;
pub mod persistor;

// Re-export primary types for convenience.
pub use coalescer::WriteCoalescer;
pub use config::{ConfigError, KEY_PREFIX, PersistConfig, PersistSettings};
pub use error::PersistError;
pub use hydrate::{Hydration, hydrate};
pub use middleware::{DispatchError, Dispatched, PersistMiddleware, StateSource};
pub use observer::{NoOpObserver, PersistEvent, PersistObserver, TracingObserver};
pub use persistor::{HydrationCallback, Persistor, persist};
pub use writeback_storage::{MemoryStorage, StorageBackend, StorageError};
