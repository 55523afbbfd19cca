//! Installer entry point.
//!
//! [`persist`] is what an integrator calls once at startup: it kicks off
//! hydration in the background and returns a [`Persistor`], from which the
//! dispatch middleware is created for the host state container.
//!
//! ```text
//! let persistor = persist(config, Some(callback));   // hydration spawned
//! let middleware = persistor.middleware(state_source);
//! middleware.dispatch(action, next).await?;           // per action
//! persistor.flush().await?;                           // on shutdown
//! ```
//!
//! Hydration and the first dispatches are not ordered against each other.
//! Integrators that must not write before the persisted state is loaded
//! should use [`Persistor::install`] and wait for it.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;
use writeback_storage::StorageError;

use crate::coalescer::WriteCoalescer;
use crate::config::PersistConfig;
use crate::error::PersistError;
use crate::hydrate::{Hydration, hydrate};
use crate::middleware::{PersistMiddleware, StateSource};

/// Completion callback for background hydration.
///
/// Called exactly once with the cleanup error (if removing a corrupt entry
/// failed) and the hydrated state.
pub type HydrationCallback = Box<dyn FnOnce(Option<StorageError>, Map<String, Value>) + Send>;

/// An installed persistence pipeline.
///
/// Cheap to clone; clones share the same pending write.
#[derive(Debug, Clone)]
pub struct Persistor {
    coalescer: Arc<WriteCoalescer>,
}

/// Install persistence for `config`.
///
/// Hydration from an empty initial state runs on a spawned task and reports
/// to `on_hydrated`, if given. The returned persistor is usable right away.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn persist(config: PersistConfig, on_hydrated: Option<HydrationCallback>) -> Persistor {
    let hydration_config = config.clone();
    tokio::spawn(async move {
        let hydration = hydrate(Map::new(), &hydration_config).await;
        if let Some(callback) = on_hydrated {
            callback(hydration.cleanup_error, hydration.state);
        }
    });
    Persistor::new(config)
}

impl Persistor {
    /// Create a persistor without hydrating.
    pub fn new(config: PersistConfig) -> Self {
        info!(
            key = config.storage_key(),
            debounce_ms = config
                .debounce_interval()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            ignore_keys = config.ignore_keys().len(),
            "Persistence installed"
        );
        Self {
            coalescer: Arc::new(WriteCoalescer::new(config)),
        }
    }

    /// Hydrate from an empty initial state, then install.
    ///
    /// The awaited counterpart of [`persist`]: no write can be triggered
    /// before the persisted state has been read.
    pub async fn install(config: PersistConfig) -> (Self, Hydration) {
        let hydration = hydrate(Map::new(), &config).await;
        (Self::new(config), hydration)
    }

    /// Middleware persisting the state read from `source`.
    pub fn middleware<S: StateSource>(&self, source: S) -> PersistMiddleware<S> {
        PersistMiddleware::new(source, Arc::clone(&self.coalescer))
    }

    /// The configuration in use.
    pub fn config(&self) -> &PersistConfig {
        self.coalescer.config()
    }

    /// The shared write coalescer.
    pub const fn coalescer(&self) -> &Arc<WriteCoalescer> {
        &self.coalescer
    }

    /// Write any pending debounced snapshot now.
    ///
    /// Returns `true` if there was one.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Write`] if the backend rejects the write.
    pub async fn flush(&self) -> Result<bool, PersistError> {
        self.coalescer.flush().await
    }
}
