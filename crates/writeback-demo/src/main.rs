//! Demo binary for the writeback persistence pipeline.
//!
//! Wires a small counter store through the persistence middleware over the
//! in-memory reference backend, the way an application would at startup.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load settings (`WRITEBACK_CONFIG` YAML file, or defaults plus
//!    `WRITEBACK_*` overrides)
//! 3. Seed the backend with a record from a "previous run"
//! 4. Install persistence and wait for the hydration callback
//! 5. Dispatch a handful of actions through the middleware
//! 6. Flush any pending write and log the persisted record

mod error;
mod store;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use writeback_core::{
    MemoryStorage, PersistConfig, PersistSettings, StorageBackend, StorageError, persist,
};

use crate::error::DemoError;
use crate::store::{Action, AppState, CounterStore};

/// Record left behind by a "previous run", restored during hydration.
const PREVIOUS_RUN_RECORD: &str = r#"{"count":40,"label":"restored"}"#;

/// Application entry point for the demo.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded or persistence fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("writeback-demo starting");

    // 2. Load settings.
    let settings = load_settings()?;
    info!(
        key = settings.key,
        debounce_interval_ms = settings.debounce_interval_ms,
        ignore_keys = ?settings.ignore_keys,
        "Settings loaded"
    );

    // 3. Seed the backend.
    let storage = MemoryStorage::new();
    let config = PersistConfig::from_settings(&settings)
        .with_storage(Arc::new(storage.clone()))
        .with_ignore_keys(ignore_keys_with_session(&settings.ignore_keys));
    let storage_key = config.storage_key();
    storage
        .set(&storage_key, PREVIOUS_RUN_RECORD.to_owned())
        .await
        .map_err(DemoError::from)?;

    // 4. Install persistence and wait for hydration.
    let (tx, rx) = oneshot::channel();
    let persistor = persist(
        config,
        Some(Box::new(
            move |error: Option<StorageError>, state: Map<String, Value>| {
                let _ = tx.send((error, state));
            },
        )),
    );
    let (cleanup_error, hydrated) = rx.await.map_err(|e| DemoError::Hydration {
        message: format!("hydration callback dropped: {e}"),
    })?;
    if let Some(error) = cleanup_error {
        warn!(%error, "Could not clear unreadable persisted state");
    }

    let store = Arc::new(CounterStore::new(AppState::from_hydrated(hydrated)));
    info!(state = ?store.state(), "Store hydrated");

    // 5. Dispatch actions.
    let source = {
        let store = Arc::clone(&store);
        move || store.snapshot()
    };
    let middleware = persistor.middleware(source);

    let actions = [
        Action::Increment(1),
        Action::Rename(String::from("demo")),
        Action::Login(String::from("not-persisted")),
        Action::SyncRemote {
            remote_count: 100,
            latency: Duration::from_millis(25),
        },
        Action::Rename(String::new()),
        Action::Increment(5),
    ];
    for action in actions {
        let label = format!("{action:?}");
        match middleware.dispatch(action, |a| store.apply(a)).await {
            Ok(count) => info!(action = label, count, "Action applied"),
            Err(e) => match DemoError::from(e) {
                DemoError::InvalidAction { message } => {
                    warn!(action = label, reason = message, "Action rejected");
                }
                other => return Err(other.into()),
            },
        }
    }

    // 6. Flush and report.
    let flushed = persistor.flush().await.map_err(DemoError::from)?;
    let record = storage
        .get(&storage_key)
        .await
        .map_err(DemoError::from)?;
    info!(
        flushed,
        record = record.as_deref().unwrap_or("<none>"),
        "Persisted record"
    );

    Ok(())
}

/// Load settings from `WRITEBACK_CONFIG` if set, otherwise from the
/// environment alone.
fn load_settings() -> Result<PersistSettings, DemoError> {
    let settings = match std::env::var("WRITEBACK_CONFIG") {
        Ok(path) => PersistSettings::from_file(Path::new(&path))?,
        Err(_) => PersistSettings::from_env()?,
    };
    Ok(settings)
}

/// The session token is never persisted, whatever the settings say.
fn ignore_keys_with_session(configured: &[String]) -> Vec<String> {
    let mut keys = configured.to_vec();
    if !keys.iter().any(|k| k == "session_token") {
        keys.push(String::from("session_token"));
    }
    keys
}
