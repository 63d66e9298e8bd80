//! Handler registry - one remote-apply function per mutation kind.
//!
//! Handlers are the only integration point with the remote store. Each one
//! attempts the remote write for a mutation and reports an [`Outcome`].
//! Errors, panics and timeouts are reported as [`Dispatch::Failed`] and are
//! replayed as transient failures.

mod http;

pub use http::{classify_status, HttpHandler, IDEMPOTENCY_HEADER};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use outbox_engine::{Mutation, MutationKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Result of attempting a mutation against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// The remote store has the change (or already had it).
    Applied,
    /// The remote state diverged; the mutation cannot be applied as-is.
    Conflict,
    /// Try again later.
    TransientFailure,
}

/// Errors a handler can raise. All of them are replayed as transient failures.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Handler timed out after {0:?}")]
    Timeout(Duration),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Applies mutations of one kind to the remote store.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn apply(&self, mutation: &Mutation) -> Result<Outcome, HandlerError>;
}

/// Adapter turning an async closure into a [`MutationHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Mutation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Outcome, HandlerError>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> MutationHandler for FnHandler<F>
where
    F: Fn(Mutation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Outcome, HandlerError>> + Send + 'static,
{
    async fn apply(&self, mutation: &Mutation) -> Result<Outcome, HandlerError> {
        (self.0)(mutation.clone()).await
    }
}

/// What happened when a mutation was routed to its handler.
#[derive(Debug)]
pub enum Dispatch {
    /// The handler ran and reported an outcome.
    Handled(Outcome),
    /// The handler errored, panicked or timed out.
    Failed(HandlerError),
    /// Nobody registered a handler for this kind.
    Unroutable,
}

/// Maps each [`MutationKind`] to at most one handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<MutationKind, Arc<dyn MutationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any previous one.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn register(&self, kind: MutationKind, handler: impl MutationHandler + 'static) -> bool {
        self.register_shared(kind, Arc::new(handler))
    }

    /// Register an already shared handler for `kind`.
    pub fn register_shared(&self, kind: MutationKind, handler: Arc<dyn MutationHandler>) -> bool {
        let replaced = self.handlers.insert(kind, handler).is_some();
        if replaced {
            tracing::debug!(kind = %kind, "Replaced mutation handler");
        }
        replaced
    }

    pub fn unregister(&self, kind: MutationKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn is_registered(&self, kind: MutationKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route `mutation` to its handler.
    pub async fn dispatch(&self, mutation: &Mutation, timeout: Option<Duration>) -> Dispatch {
        // Clone the Arc so no map guard is held across the await.
        let handler = match self.handlers.get(&mutation.kind) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Dispatch::Unroutable,
        };

        let call = AssertUnwindSafe(handler.apply(mutation)).catch_unwind();
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Dispatch::Failed(HandlerError::Timeout(limit)),
            },
            None => call.await,
        };

        match result {
            Ok(Ok(outcome)) => Dispatch::Handled(outcome),
            Ok(Err(e)) => Dispatch::Failed(e),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Dispatch::Failed(HandlerError::Panicked(message))
            }
        }
    }
}
