//! Persistent queue store: the full mutation list under one storage key.

use crate::error::StorageError;
use crate::storage::Storage;
use outbox_engine::{DecodedQueue, Mutation, QueueSnapshot};
use std::sync::Arc;

/// Default key the queue is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "offline_mutation_queue";

/// What a load attempt found.
#[derive(Debug)]
pub enum LoadState {
    /// Nothing has been saved yet.
    Absent,
    /// The queue was decoded; some entries may have been skipped.
    Restored(DecodedQueue),
    /// The stored document could not be decoded at all.
    Corrupted(outbox_engine::Error),
    /// The backend failed to read.
    Unreadable(StorageError),
}

impl LoadState {
    /// Fall back to an empty queue for everything but a successful restore.
    ///
    /// Forward progress wins over recovery: a corrupted or unreadable queue
    /// is treated as empty and will be overwritten by the next save.
    pub fn into_mutations_or_empty(self) -> Vec<Mutation> {
        match self {
            LoadState::Restored(decoded) => decoded.mutations,
            LoadState::Absent | LoadState::Corrupted(_) | LoadState::Unreadable(_) => Vec::new(),
        }
    }
}

/// Loads and saves the queue through a [`Storage`] backend.
#[derive(Clone)]
pub struct QueueStore {
    storage: Arc<dyn Storage>,
    key: String,
}

impl QueueStore {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the queue, reporting exactly what was found.
    pub async fn try_load(&self) -> LoadState {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadState::Absent,
            Err(e) => return LoadState::Unreadable(e),
        };

        match QueueSnapshot::decode(&raw) {
            Ok(decoded) => {
                for skipped in &decoded.skipped {
                    tracing::warn!(
                        key = %self.key,
                        index = skipped.index,
                        mutation_id = ?skipped.id,
                        "Skipping undecodable queue entry: {}",
                        skipped.reason
                    );
                }
                LoadState::Restored(decoded)
            }
            Err(e) => LoadState::Corrupted(e),
        }
    }

    /// Load the queue, treating absent, corrupted and unreadable storage as empty.
    ///
    /// Entries that fail to decode are logged and left out. They do not
    /// survive the next [`QueueStore::save`], which writes only what was loaded.
    pub async fn load(&self) -> Vec<Mutation> {
        let state = self.try_load().await;
        match &state {
            LoadState::Corrupted(e) => {
                tracing::warn!(key = %self.key, "Queue storage corrupted, starting empty: {}", e);
            }
            LoadState::Unreadable(e) => {
                tracing::warn!(key = %self.key, "Queue storage unreadable, starting empty: {}", e);
            }
            LoadState::Absent | LoadState::Restored(_) => {}
        }
        state.into_mutations_or_empty()
    }

    /// Overwrite storage with the full list.
    pub async fn save(&self, mutations: &[Mutation]) -> Result<(), crate::error::OutboxError> {
        let json = QueueSnapshot::new(mutations.to_vec()).to_json()?;
        self.storage.set(&self.key, &json).await?;
        tracing::trace!(key = %self.key, len = mutations.len(), "Saved queue");
        Ok(())
    }
}
