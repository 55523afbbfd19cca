//! Configuration for one persistence installation.
//!
//! Two layers:
//!
//! - [`PersistSettings`] is the plain, deserializable part (`key`,
//!   `debounce_interval_ms`, `ignore_keys`). It can be loaded from a YAML
//!   file and overridden from the environment.
//! - [`PersistConfig`] is the runtime configuration handed to the
//!   persistor. It adds the pieces that cannot live in a file: the storage
//!   backend and the diagnostic observer.
//!
//! A `PersistConfig` is immutable once the persistor is installed.
//!
//! # Environment overrides
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `WRITEBACK_KEY` | `key` |
//! | `WRITEBACK_DEBOUNCE_MS` | `debounce_interval_ms` (`0` or empty disables) |
//! | `WRITEBACK_IGNORE_KEYS` | `ignore_keys` (comma-separated) |

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use writeback_storage::{MemoryStorage, StorageBackend};

use crate::observer::{PersistObserver, TracingObserver};

/// Prefix prepended to every configured key before it reaches storage.
///
/// Keeps persisted snapshots from colliding with unrelated entries in a
/// shared backend.
pub const KEY_PREFIX: &str = "persist:";

/// Key used when none is configured.
pub const DEFAULT_KEY: &str = "[rc]";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid {variable}: {message}")]
    Env {
        /// The offending environment variable.
        variable: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// File- and environment-backed persistence settings.
///
/// Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistSettings {
    /// Storage key, before [`KEY_PREFIX`] is applied.
    #[serde(default = "default_key")]
    pub key: String,

    /// Delay before a coalesced write fires. `None` or `0` writes on every
    /// action.
    #[serde(default)]
    pub debounce_interval_ms: Option<u64>,

    /// Top-level state fields never written to storage.
    #[serde(default)]
    pub ignore_keys: Vec<String>,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            key: default_key(),
            debounce_interval_ms: None,
            ignore_keys: Vec::new(),
        }
    }
}

impl PersistSettings {
    /// Load settings from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut settings = Self::parse(&contents)?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Parse settings from a YAML string. Environment overrides are not
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yml::from_str(yaml)?;
        Ok(settings)
    }

    /// Default settings with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if an override is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Override fields from `WRITEBACK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `WRITEBACK_DEBOUNCE_MS` is not an
    /// integer.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("WRITEBACK_KEY") {
            self.key = val;
        }
        if let Some(val) = lookup("WRITEBACK_DEBOUNCE_MS") {
            let trimmed = val.trim();
            self.debounce_interval_ms = if trimmed.is_empty() {
                None
            } else {
                let ms = trimmed.parse::<u64>().map_err(|e| ConfigError::Env {
                    variable: "WRITEBACK_DEBOUNCE_MS",
                    message: e.to_string(),
                })?;
                Some(ms)
            };
        }
        if let Some(val) = lookup("WRITEBACK_IGNORE_KEYS") {
            self.ignore_keys = val
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect();
        }
        Ok(())
    }
}

/// Runtime configuration for one persistor installation.
///
/// Built once, then shared (cheaply cloned) between the hydration task, the
/// write coalescer and its timer tasks.
#[derive(Clone)]
pub struct PersistConfig {
    key: String,
    storage: Arc<dyn StorageBackend>,
    debounce_interval: Option<Duration>,
    ignore_keys: Vec<String>,
    observer: Arc<dyn PersistObserver>,
}

impl PersistConfig {
    /// Configuration for `key` with the defaults: [`MemoryStorage`], no
    /// debounce, no ignored fields, [`TracingObserver`].
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            storage: Arc::new(MemoryStorage::new()),
            debounce_interval: None,
            ignore_keys: Vec::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Build a runtime configuration from loaded settings, using the default
    /// storage and observer.
    pub fn from_settings(settings: &PersistSettings) -> Self {
        let mut config = Self::new(settings.key.clone())
            .with_ignore_keys(settings.ignore_keys.iter().cloned());
        if let Some(ms) = settings.debounce_interval_ms {
            config = config.with_debounce_interval_ms(ms);
        }
        config
    }

    /// Use `storage` as the backend.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    /// Coalesce writes, firing `interval` after the latest action.
    ///
    /// A zero interval disables debouncing.
    #[must_use]
    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Same as [`with_debounce_interval`](Self::with_debounce_interval), in
    /// milliseconds.
    #[must_use]
    pub fn with_debounce_interval_ms(self, ms: u64) -> Self {
        self.with_debounce_interval(Duration::from_millis(ms))
    }

    /// Omit these top-level fields from every persisted snapshot.
    #[must_use]
    pub fn with_ignore_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Report diagnostic events to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PersistObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configured key, without the namespace prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The key actually used in storage: [`KEY_PREFIX`] followed by
    /// [`key`](Self::key).
    pub fn storage_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.key)
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// The debounce interval, if writes are coalesced.
    pub const fn debounce_interval(&self) -> Option<Duration> {
        self.debounce_interval
    }

    /// Fields omitted from persisted snapshots.
    pub fn ignore_keys(&self) -> &[String] {
        &self.ignore_keys
    }

    /// The diagnostic observer.
    pub fn observer(&self) -> &Arc<dyn PersistObserver> {
        &self.observer
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

impl fmt::Debug for PersistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("key", &self.key)
            .field("debounce_interval", &self.debounce_interval)
            .field("ignore_keys", &self.ignore_keys)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_key() -> String {
    DEFAULT_KEY.to_owned()
}
