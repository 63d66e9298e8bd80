//! The outbox: enqueue write intents and replay them against the remote store.
//!
//! # Drain cycle
//!
//! 1. Ask the connectivity gate; if unreachable, stop without touching storage
//! 2. Load the queue
//! 3. Replay each mutation in order through its handler
//! 4. Persist the decision for that mutation before moving on
//!
//! Applied and conflicting mutations are removed. A transient failure bumps
//! the retry counter and backs off for `base_delay * 2^retries` before the
//! next mutation; the failed one is retried on the next cycle. A mutation
//! whose retry budget is spent is dropped so it cannot block the queue.
//!
//! Each mutation is re-read by id just before dispatch, and every decision is
//! applied by id against freshly loaded state under the same lock `enqueue`
//! uses. A mutation collapsed away while an earlier handler runs is never
//! sent; one enqueued while a drain is in flight is never overwritten and is
//! replayed on the next cycle.

use crate::config::ReplayConfig;
use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::handlers::{Dispatch, HandlerRegistry, MutationHandler, Outcome};
use crate::queue_store::{LoadState, QueueStore};
use outbox_engine::{CollapseOutcome, Mutation, MutationKind, PendingQueue, RetryDecision};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;

/// Summary of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// The gate was closed; nothing was attempted
    pub offline: bool,
    /// Mutations handed to the dispatcher
    pub attempted: usize,
    /// Removed after the remote applied them
    pub applied: usize,
    /// Removed after the remote reported a conflict
    pub conflicts: usize,
    /// Kept with an incremented retry counter
    pub retried: usize,
    /// Removed because the retry budget ran out
    pub dropped: usize,
    /// Removed because no handler was registered
    pub unroutable: usize,
    /// Decisions that could not be saved
    pub persist_failures: usize,
}

/// Durable mutation queue with connectivity-gated replay.
pub struct Outbox {
    store: QueueStore,
    handlers: HandlerRegistry,
    connectivity: Arc<dyn Connectivity>,
    config: ReplayConfig,
    /// Serializes every load-modify-save of the stored queue
    state: Mutex<()>,
    /// Serializes drain cycles
    draining: Mutex<()>,
    wake: Notify,
}

impl Outbox {
    pub fn new(
        store: QueueStore,
        connectivity: Arc<dyn Connectivity>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            store,
            handlers: HandlerRegistry::new(),
            connectivity,
            config,
            state: Mutex::new(()),
            draining: Mutex::new(()),
            wake: Notify::new(),
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn register(&self, kind: MutationKind, handler: impl MutationHandler + 'static) -> bool {
        self.handlers.register(kind, handler)
    }

    /// Record a mutation durably, collapsing it into an earlier one when allowed.
    ///
    /// A corrupted queue is replaced; a queue that could not be read at all
    /// is left alone and the error returned, so a flaky read never clobbers
    /// mutations that are still on disk.
    pub async fn enqueue(&self, mutation: Mutation) -> Result<CollapseOutcome> {
        let _guard = self.state.lock().await;

        let existing = match self.store.try_load().await {
            LoadState::Unreadable(e) => return Err(e.into()),
            LoadState::Corrupted(e) => {
                tracing::warn!(key = %self.store.key(), "Replacing corrupted queue: {}", e);
                Vec::new()
            }
            state => state.into_mutations_or_empty(),
        };

        let mut queue = PendingQueue::from_mutations(existing);
        let (id, kind) = (mutation.id.clone(), mutation.kind);
        let outcome = queue.enqueue(mutation);
        self.store.save(queue.mutations()).await?;

        match &outcome {
            CollapseOutcome::Appended { index } => {
                tracing::debug!(mutation_id = %id, kind = %kind, index, "Enqueued mutation");
            }
            CollapseOutcome::Replaced { index, previous } => {
                tracing::debug!(
                    mutation_id = %id,
                    replaced_id = %previous.id,
                    kind = %kind,
                    index,
                    "Collapsed mutation into queued entry"
                );
            }
        }

        Ok(outcome)
    }

    /// Current queue contents, in replay order.
    pub async fn pending(&self) -> Vec<Mutation> {
        let _guard = self.state.lock().await;
        self.store.load().await
    }

    /// Run one drain cycle. Never fails; the report is informational.
    pub async fn drain(&self) -> DrainReport {
        let _draining = self.draining.lock().await;
        let mut report = DrainReport::default();

        if !self.connectivity.is_reachable().await {
            tracing::debug!("Remote unreachable, skipping drain");
            report.offline = true;
            return report;
        }

        let ids: Vec<_> = {
            let _guard = self.state.lock().await;
            self.store.load().await.into_iter().map(|m| m.id).collect()
        };

        for id in ids {
            let Some(mutation) = self.current(&id).await else {
                tracing::debug!(mutation_id = %id, "Mutation collapsed away, skipping");
                continue;
            };
            report.attempted += 1;

            match self
                .handlers
                .dispatch(&mutation, self.config.handler_timeout)
                .await
            {
                Dispatch::Handled(Outcome::Applied) => {
                    tracing::debug!(mutation_id = %mutation.id, kind = %mutation.kind, "Mutation applied");
                    report.applied += 1;
                    self.remove(&mutation, &mut report).await;
                }
                Dispatch::Handled(Outcome::Conflict) => {
                    tracing::info!(
                        mutation_id = %mutation.id,
                        kind = %mutation.kind,
                        "Mutation conflicts with remote state, discarding"
                    );
                    report.conflicts += 1;
                    self.remove(&mutation, &mut report).await;
                }
                Dispatch::Unroutable => {
                    tracing::debug!(
                        mutation_id = %mutation.id,
                        kind = %mutation.kind,
                        "No handler registered, treating as applied"
                    );
                    report.unroutable += 1;
                    self.remove(&mutation, &mut report).await;
                }
                Dispatch::Handled(Outcome::TransientFailure) => {
                    self.fail(&mutation, &mut report).await;
                }
                Dispatch::Failed(e) => {
                    tracing::warn!(mutation_id = %mutation.id, kind = %mutation.kind, "Handler failed: {}", e);
                    self.fail(&mutation, &mut report).await;
                }
            }
        }

        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                applied = report.applied,
                conflicts = report.conflicts,
                retried = report.retried,
                dropped = report.dropped,
                "Drain cycle complete"
            );
        }

        report
    }

    /// Ask a running [`Outbox::run`] loop to drain now.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Drain every `interval` and on [`Outbox::wake`] until `shutdown` resolves.
    ///
    /// This loop is the single driver of drain cycles; an in-progress cycle
    /// always runs to completion before shutdown is observed.
    pub async fn run(&self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(interval = ?interval, "Outbox worker started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {
                    tracing::debug!("Outbox woken");
                }
            }
            self.drain().await;
        }

        tracing::info!("Outbox worker stopped");
    }

    /// The queued mutation with `id` as it is stored right now.
    async fn current(&self, id: &str) -> Option<Mutation> {
        let _guard = self.state.lock().await;
        self.store.load().await.into_iter().find(|m| m.id == id)
    }

    async fn remove(&self, mutation: &Mutation, report: &mut DrainReport) {
        let _guard = self.state.lock().await;
        let mut queue = PendingQueue::from_mutations(self.store.load().await);

        if queue.remove(&mutation.id).is_err() {
            // Collapsed away by a newer enqueue while the handler ran.
            tracing::debug!(mutation_id = %mutation.id, "Mutation no longer queued");
            return;
        }
        self.persist(&queue, report).await;
    }

    async fn fail(&self, mutation: &Mutation, report: &mut DrainReport) {
        let decision = {
            let _guard = self.state.lock().await;
            let mut queue = PendingQueue::from_mutations(self.store.load().await);

            match queue.record_failure(&mutation.id, &self.config.retry) {
                Ok(decision) => {
                    self.persist(&queue, report).await;
                    Some(decision)
                }
                Err(_) => None,
            }
        };

        match decision {
            Some(RetryDecision::GiveUp) => {
                tracing::warn!(
                    mutation_id = %mutation.id,
                    kind = %mutation.kind,
                    max_retries = self.config.retry.max_retries,
                    "Retry budget exhausted, dropping mutation"
                );
                report.dropped += 1;
            }
            Some(RetryDecision::Retry { retries, delay }) => {
                tracing::debug!(
                    mutation_id = %mutation.id,
                    retries,
                    delay = ?delay,
                    "Transient failure, backing off"
                );
                report.retried += 1;
                tokio::time::sleep(delay).await;
            }
            None => {
                tracing::debug!(mutation_id = %mutation.id, "Mutation no longer queued");
            }
        }
    }

    async fn persist(&self, queue: &PendingQueue, report: &mut DrainReport) {
        if let Err(e) = self.store.save(queue.mutations()).await {
            tracing::error!(key = %self.store.key(), "Failed to persist queue: {}", e);
            report.persist_failures += 1;
        }
    }
}
