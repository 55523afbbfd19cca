//! A small host state container for the demo.
//!
//! `CounterStore` plays the part of the application's store: it owns a
//! typed [`AppState`], applies [`Action`]s to it, and exposes its state as
//! JSON for the persistence middleware to read.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use writeback_core::Dispatched;

use crate::error::DemoError;

/// The demo application's state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    /// A counter bumped by [`Action::Increment`].
    pub count: i64,
    /// A display label.
    pub label: String,
    /// Session token. Configured as an ignored key, so it is never persisted.
    pub session_token: Option<String>,
}

impl AppState {
    /// Build the state from a hydrated mapping, falling back to defaults if
    /// the mapping does not fit.
    pub fn from_hydrated(fields: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(fields)).unwrap_or_else(|e| {
            warn!(error = %e, "Hydrated state does not match AppState, using defaults");
            Self::default()
        })
    }
}

/// Things the demo can do to its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Add to the counter.
    Increment(i64),
    /// Change the label. Empty labels are rejected.
    Rename(String),
    /// Start a session.
    Login(String),
    /// Pretend to fetch the counter from a remote service.
    SyncRemote {
        /// Value the "remote" reports.
        remote_count: i64,
        /// Simulated latency.
        latency: Duration,
    },
}

/// Shared, lock-protected application state.
#[derive(Debug, Default)]
pub struct CounterStore {
    state: RwLock<AppState>,
}

impl CounterStore {
    /// Create a store holding `state`.
    pub const fn new(state: AppState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Current state.
    pub fn state(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current state as JSON, for the persistence middleware.
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self.state()).unwrap_or(Value::Null)
    }

    /// Apply `action`, returning the new counter value.
    ///
    /// [`Action::SyncRemote`] completes asynchronously; every other action
    /// is applied before this returns.
    pub fn apply(self: &Arc<Self>, action: Action) -> Dispatched<i64, DemoError> {
        match action {
            Action::Increment(by) => Dispatched::ready(self.update(|s| {
                s.count = s.count.saturating_add(by);
            })),
            Action::Rename(label) if label.trim().is_empty() => {
                Dispatched::failed(DemoError::InvalidAction {
                    message: String::from("label must not be empty"),
                })
            }
            Action::Rename(label) => Dispatched::ready(self.update(|s| s.label = label)),
            Action::Login(token) => {
                Dispatched::ready(self.update(|s| s.session_token = Some(token)))
            }
            Action::SyncRemote {
                remote_count,
                latency,
            } => {
                let store = Arc::clone(self);
                Dispatched::pending(async move {
                    tokio::time::sleep(latency).await;
                    Ok(store.update(|s| s.count = remote_count))
                })
            }
        }
    }

    fn update<F: FnOnce(&mut AppState)>(&self, mutate: F) -> i64 {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        mutate(&mut state);
        state.count
    }
}
