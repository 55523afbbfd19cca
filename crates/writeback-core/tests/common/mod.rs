//! Shared fixtures for the integration tests: a backend that records every
//! call and can be told to fail, an observer that records every event, and
//! a minimal host state container.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use writeback_core::{MemoryStorage, PersistEvent, PersistObserver, StorageBackend, StorageError};

/// One call received by [`ScriptedStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String),
    Set(String, String),
    Remove(String),
}

/// [`MemoryStorage`] wrapper that records calls and injects failures and
/// latency.
#[derive(Debug, Default)]
pub struct ScriptedStorage {
    inner: MemoryStorage,
    calls: Mutex<Vec<Call>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_remove: AtomicBool,
    offline: AtomicBool,
    set_delays: Mutex<VecDeque<Duration>>,
    sets_in_flight: AtomicUsize,
    max_sets_in_flight: AtomicUsize,
}

impl ScriptedStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_get(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }

    pub fn fail_set(&self) {
        self.fail_set.store(true, Ordering::SeqCst);
    }

    pub fn fail_remove(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }

    /// Every call fails with [`StorageError::Unavailable`].
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Delay the next `set` calls, one entry per call. Calls beyond the
    /// queue complete without added latency.
    pub fn delay_sets<I>(&self, delays: I)
    where
        I: IntoIterator<Item = Duration>,
    {
        self.set_delays.lock().unwrap().extend(delays);
    }

    /// Highest number of `set` calls that were running at the same time.
    pub fn max_sets_in_flight(&self) -> usize {
        self.max_sets_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Payloads of every `set` call, in order.
    pub fn sets(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Set(key, value) => Some((key, value)),
                _ => None,
            })
            .collect()
    }

    /// Keys of every `remove` call, in order.
    pub fn removes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Remove(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Seed a raw value without recording a call.
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value.to_owned()).await.unwrap();
    }

    /// Read a raw value without recording a call.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.unwrap()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable<T>(&self) -> Option<BoxFuture<'static, Result<T, StorageError>>>
    where
        T: Send + 'static,
    {
        if self.offline.load(Ordering::SeqCst) {
            Some(Box::pin(async {
                Err(StorageError::Unavailable(String::from("backend offline")))
            }))
        } else {
            None
        }
    }
}

impl StorageBackend for ScriptedStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        self.record(Call::Get(key.to_owned()));
        if let Some(offline) = self.unavailable() {
            return offline;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Box::pin(async move {
                Err(StorageError::Read {
                    key: key.to_owned(),
                    message: String::from("injected read failure"),
                })
            });
        }
        self.inner.get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, Result<String, StorageError>> {
        self.record(Call::Set(key.to_owned(), value.clone()));
        if let Some(offline) = self.unavailable() {
            return offline;
        }
        if self.fail_set.load(Ordering::SeqCst) {
            return Box::pin(async move {
                Err(StorageError::Write {
                    key: key.to_owned(),
                    message: String::from("injected write failure"),
                })
            });
        }
        let delay = self.set_delays.lock().unwrap().pop_front();
        Box::pin(async move {
            let running = self.sets_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_sets_in_flight.fetch_max(running, Ordering::SeqCst);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let result = self.inner.set(key, value).await;
            self.sets_in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        self.record(Call::Remove(key.to_owned()));
        if let Some(offline) = self.unavailable() {
            return offline;
        }
        if self.fail_remove.load(Ordering::SeqCst) {
            return Box::pin(async move {
                Err(StorageError::Remove {
                    key: key.to_owned(),
                    message: String::from("injected remove failure"),
                })
            });
        }
        self.inner.remove(key)
    }
}

/// Observer that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PersistEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PersistEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn write_failures(&self) -> Vec<(StorageError, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PersistEvent::WriteFailed {
                    error, debounced, ..
                } => Some((error, debounced)),
                _ => None,
            })
            .collect()
    }
}

impl PersistObserver for RecordingObserver {
    fn on_event(&self, event: &PersistEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Stand-in for the host state container: a shared JSON value.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    state: Arc<RwLock<Value>>,
}

impl HostState {
    pub fn new(initial: Value) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set(&self, value: Value) {
        *self.state.write().unwrap() = value;
    }

    pub fn get(&self) -> Value {
        self.state.read().unwrap().clone()
    }

    /// Closure handed to the middleware as its state source.
    pub fn source(&self) -> impl Fn() -> Value + Send + Sync + 'static {
        let state = Arc::clone(&self.state);
        move || state.read().unwrap().clone()
    }
}
