//! PendingQueue - the ordered list of mutations not yet applied remotely.
//!
//! The queue is the sole source of truth for what still has to reach the
//! remote store. It is a plain in-memory value; loading and saving it is the
//! caller's job (see [`QueueSnapshot`]).

use crate::{
    collapse::{collapse_into, CollapseOutcome},
    error::Result,
    Error, Mutation, QueueSnapshot, RetryDecision, RetryPolicy,
};

/// Ordered mutations awaiting replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingQueue {
    mutations: Vec<Mutation>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            mutations: Vec::new(),
        }
    }

    /// Wrap an already ordered list.
    pub fn from_mutations(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }

    /// Add a mutation, collapsing it into an earlier one when allowed.
    pub fn enqueue(&mut self, mutation: Mutation) -> CollapseOutcome {
        collapse_into(&mut self.mutations, mutation)
    }

    /// All queued mutations in replay order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Get a mutation by id.
    pub fn get(&self, id: &str) -> Option<&Mutation> {
        self.mutations.iter().find(|m| m.id == id)
    }

    /// Index of a mutation by id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.mutations.iter().position(|m| m.id == id)
    }

    /// Remove a mutation by id, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Result<Mutation> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::MutationNotFound(id.to_string()))?;
        Ok(self.mutations.remove(index))
    }

    /// Record a transient failure of `id` under `policy`.
    ///
    /// On [`RetryDecision::GiveUp`] the mutation is removed; otherwise its
    /// retry count is bumped in place.
    pub fn record_failure(&mut self, id: &str, policy: &RetryPolicy) -> Result<RetryDecision> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::MutationNotFound(id.to_string()))?;

        let decision = policy.decide(self.mutations[index].retries);
        match decision {
            RetryDecision::GiveUp => {
                self.mutations.remove(index);
            }
            RetryDecision::Retry { retries, .. } => {
                self.mutations[index].retries = retries;
            }
        }

        Ok(decision)
    }

    /// Export as the persisted layout.
    pub fn to_snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::new(self.mutations.clone())
    }
}

impl From<QueueSnapshot> for PendingQueue {
    fn from(snapshot: QueueSnapshot) -> Self {
        Self::from_mutations(snapshot.mutations)
    }
}
