//! Durable key-value storage backends.
//!
//! The queue lives under a single key as one serialized document, so a
//! backend only needs whole-value `get` and `set`.

mod file;
mod sqlite;

pub use file::FileStorage;
pub use sqlite::{create_pool, run_migrations, Pool, SqliteStorage};

use crate::error::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;

/// Async key-value storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the value under `key`, `None` if never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
