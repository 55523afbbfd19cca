//! Dispatch adapter between the host state container and the coalescer.
//!
//! The host owns its actions, reducers and state; this module only needs two
//! things from it: a way to run the next stage of its dispatch pipeline for
//! an action, and a way to read the current state ([`StateSource`]).
//!
//! For each action, [`PersistMiddleware::dispatch`]:
//!
//! 1. runs the host's next stage right away,
//! 2. waits for the stage's result if it is asynchronous,
//! 3. triggers a write of the current state,
//! 4. hands the stage's own value back.
//!
//! A failed write on the immediate (non-debounced) path replaces the
//! action's value with [`DispatchError::Persist`], even though the action
//! itself succeeded. A failed action is passed through as
//! [`DispatchError::Action`] and nothing is written.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::coalescer::WriteCoalescer;
use crate::error::PersistError;

/// Read access to the host's current state.
pub trait StateSource: Send + Sync {
    /// Snapshot of the state as it is right now.
    fn current_state(&self) -> Value;
}

impl<F> StateSource for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn current_state(&self) -> Value {
        self()
    }
}

/// What the host's next dispatch stage produced for an action.
pub enum Dispatched<T, E> {
    /// The stage finished synchronously.
    Ready(Result<T, E>),
    /// The stage returned work that settles later.
    Pending(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> Dispatched<T, E> {
    /// A synchronous success.
    pub const fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// A synchronous failure.
    pub const fn failed(error: E) -> Self {
        Self::Ready(Err(error))
    }

    /// An asynchronous result.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Whether the result still has to settle.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Errors returned by [`PersistMiddleware::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E> {
    /// The host's own dispatch stage failed. Nothing was persisted.
    #[error("action failed: {0}")]
    Action(E),

    /// The action succeeded but persisting the resulting state failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl<E> DispatchError<E> {
    /// The host's error, if the action itself failed.
    pub fn into_action(self) -> Option<E> {
        match self {
            Self::Action(error) => Some(error),
            Self::Persist(_) => None,
        }
    }

    /// Whether the failure came from persistence rather than the action.
    pub const fn is_persist(&self) -> bool {
        matches!(self, Self::Persist(_))
    }
}

/// Persistence middleware bound to one host state source.
pub struct PersistMiddleware<S> {
    source: S,
    coalescer: Arc<WriteCoalescer>,
}

impl<S: StateSource> PersistMiddleware<S> {
    /// Bind `coalescer` to the host state read through `source`.
    pub const fn new(source: S, coalescer: Arc<WriteCoalescer>) -> Self {
        Self { source, coalescer }
    }

    /// Run `next` for `action`, then persist the resulting state.
    ///
    /// `next` is called before this method returns, so actions reach the
    /// host in the order `dispatch` is called regardless of when the
    /// returned futures are awaited. The future resolves with the value
    /// `next` produced once the coalescer has accepted (or, without
    /// debounce, completed) the write.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Action`] if `next` failed, or
    /// [`DispatchError::Persist`] if the write failed.
    pub fn dispatch<A, T, E, N>(
        &self,
        action: A,
        next: N,
    ) -> impl Future<Output = Result<T, DispatchError<E>>>
    where
        N: FnOnce(A) -> Dispatched<T, E>,
    {
        let dispatched = next(action);
        async move {
            let settled = match dispatched {
                Dispatched::Ready(result) => result,
                Dispatched::Pending(future) => future.await,
            };
            let value = match settled {
                Ok(value) => value,
                Err(error) => return Err(DispatchError::Action(error)),
            };
            if let Err(error) = self
                .coalescer
                .trigger(|| self.source.current_state())
                .await
            {
                return Err(DispatchError::Persist(error));
            }
            Ok(value)
        }
    }

    /// The host state source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The coalescer writes go through.
    pub const fn coalescer(&self) -> &Arc<WriteCoalescer> {
        &self.coalescer
    }
}
