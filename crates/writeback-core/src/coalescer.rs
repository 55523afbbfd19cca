//! Write scheduling with optional debounce.
//!
//! [`WriteCoalescer::trigger`] is called after every state-changing action.
//! Without a debounce interval each trigger writes straight through and the
//! caller learns whether the write succeeded. With an interval, the trigger
//! captures and encodes the snapshot, arms a timer, and returns at once; the
//! write happens when the timer fires.
//!
//! # Coalescing
//!
//! At most one write is pending per coalescer. A new trigger cancels the
//! pending write (if it has not fired yet) and arms a fresh timer with its
//! own snapshot, so a burst of actions persists only the last snapshot.
//! There is no maximum delay: a stream of actions spaced closer than the
//! interval keeps postponing the write.
//!
//! The pending slot carries a generation number. A timer task only writes
//! if, once awake, it can still claim the slot with its own generation; a
//! write that has been claimed is never aborted, and a replaced write never
//! reaches storage.
//!
//! Debounced writes also pass through a write gate held for the duration of
//! the backend `set`. A timer that fires while an earlier debounced write is
//! still in flight waits for it, then re-checks its generation, so debounced
//! `set` calls for the key never overlap and an older snapshot can never land
//! after a newer one. Immediate writes do not take the gate.
//!
//! # Failures
//!
//! A failed debounced write cannot be reported to the action that caused
//! it, since that call has already returned. It is reported to the
//! [`PersistObserver`](crate::observer::PersistObserver) as
//! [`PersistEvent::WriteFailed`] with `debounced: true`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use writeback_storage::StorageError;

use crate::codec;
use crate::config::PersistConfig;
use crate::error::PersistError;
use crate::observer::PersistEvent;

/// Debounced, single-pending writer for one [`PersistConfig`].
#[derive(Debug)]
pub struct WriteCoalescer {
    config: PersistConfig,
    pending: Arc<Mutex<PendingSlot>>,
    write_gate: Arc<Mutex<()>>,
}

#[derive(Debug, Default)]
struct PendingSlot {
    generation: u64,
    write: Option<PendingWrite>,
}

#[derive(Debug)]
struct PendingWrite {
    generation: u64,
    payload: String,
    timer: JoinHandle<()>,
}

impl WriteCoalescer {
    /// Create a coalescer with no pending write.
    pub fn new(config: PersistConfig) -> Self {
        Self {
            config,
            pending: Arc::new(Mutex::new(PendingSlot::default())),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// The configuration this coalescer writes with.
    pub const fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// Persist the state returned by `read_state`.
    ///
    /// `read_state` is called exactly once, when the returned future is first
    /// polled. Resolves with that snapshot: after the write succeeded when
    /// there is no debounce, or immediately once the write is scheduled when
    /// there is one.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] if the snapshot cannot be serialized,
    /// or [`PersistError::Write`] if an immediate (non-debounced) write is
    /// rejected by the backend.
    pub async fn trigger<F>(&self, read_state: F) -> Result<Value, PersistError>
    where
        F: FnOnce() -> Value,
    {
        let snapshot = read_state();
        let payload = codec::encode(&snapshot, self.config.ignore_keys())?;

        match self.config.debounce_interval() {
            None => {
                write_payload(&self.config, payload, false).await?;
            }
            Some(delay) => self.schedule(payload, delay).await,
        }
        Ok(snapshot)
    }

    /// Write the pending snapshot now instead of waiting for its timer.
    ///
    /// A debounced write already in flight is awaited first, so once this
    /// resolves every snapshot triggered so far has settled at the backend.
    /// Returns `true` if there was a pending write. Use this when tearing
    /// down, so the last snapshot is not lost with the timer.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Write`] if the backend rejects the write.
    pub async fn flush(&self) -> Result<bool, PersistError> {
        let _gate = self.write_gate.lock().await;
        let claimed = self.pending.lock().await.write.take();
        let Some(write) = claimed else {
            return Ok(false);
        };
        write.timer.abort();
        write_payload(&self.config, write.payload, false).await?;
        Ok(true)
    }

    /// Drop the pending snapshot without writing it.
    ///
    /// Returns `true` if there was a pending write.
    pub async fn cancel(&self) -> bool {
        let claimed = self.pending.lock().await.write.take();
        match claimed {
            Some(write) => {
                write.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a scheduled write has not fired yet.
    pub async fn has_pending(&self) -> bool {
        self.pending.lock().await.write.is_some()
    }

    async fn schedule(&self, payload: String, delay: Duration) {
        let mut slot = self.pending.lock().await;

        let replaced = slot.write.take();
        if let Some(previous) = &replaced {
            previous.timer.abort();
        }

        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        let timer = tokio::spawn(fire_after(
            delay,
            generation,
            Arc::clone(&self.pending),
            Arc::clone(&self.write_gate),
            self.config.clone(),
        ));
        slot.write = Some(PendingWrite {
            generation,
            payload,
            timer,
        });
        drop(slot);

        self.config
            .observer()
            .on_event(&PersistEvent::WriteScheduled {
                key: self.config.storage_key(),
                delay,
                replaced_pending: replaced.is_some(),
            });
    }
}

/// Timer task body: sleep, wait out any in-flight write, claim the slot if
/// still current, write.
async fn fire_after(
    delay: Duration,
    generation: u64,
    pending: Arc<Mutex<PendingSlot>>,
    write_gate: Arc<Mutex<()>>,
    config: PersistConfig,
) {
    tokio::time::sleep(delay).await;

    // Lock order is gate, then slot. `schedule` only takes the slot.
    let _gate = write_gate.lock().await;
    let claimed = {
        let mut slot = pending.lock().await;
        if slot
            .write
            .as_ref()
            .is_some_and(|write| write.generation == generation)
        {
            slot.write.take()
        } else {
            None
        }
    };

    if let Some(write) = claimed {
        // Failure is already reported to the observer; nobody awaits us.
        let _ = write_payload(&config, write.payload, true).await;
    }
}

async fn write_payload(
    config: &PersistConfig,
    payload: String,
    debounced: bool,
) -> Result<(), StorageError> {
    let key = config.storage_key();
    let bytes = payload.len();

    match config.storage().set(&key, payload).await {
        Ok(_) => {
            config
                .observer()
                .on_event(&PersistEvent::WriteCompleted { key, bytes });
            Ok(())
        }
        Err(error) => {
            config.observer().on_event(&PersistEvent::WriteFailed {
                key,
                error: error.clone(),
                debounced,
            });
            Err(error)
        }
    }
}
