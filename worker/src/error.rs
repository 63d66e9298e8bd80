//! Error types for the worker.

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Errors surfaced to callers of [`crate::Outbox`].
///
/// Replay never returns these; only caller-initiated operations such as
/// enqueueing do.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] outbox_engine::Error),
}

/// Result type alias for outbox operations.
pub type Result<T> = std::result::Result<T, OutboxError>;
