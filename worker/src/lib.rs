//! # Outbox Worker
//!
//! Durable offline mutation queue for sync clients.
//!
//! Write intents are enqueued into durable storage the moment the user acts
//! and replayed against the remote store whenever the connectivity gate
//! reports it reachable. Queue logic (collapsing, retry policy, persisted
//! layout) comes from `outbox-engine`; this crate adds storage backends,
//! the handler registry and the async replay loop.
//!
//! ```no_run
//! use std::sync::Arc;
//! use outbox_worker::{
//!     handler_fn, ConnectivityFlag, HandlerError, MemoryStorage, Outbox, Outcome, QueueStore,
//!     ReplayConfig,
//! };
//! use outbox_engine::{Mutation, MutationKind};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = QueueStore::new(Arc::new(MemoryStorage::new()), "queue");
//! let gate = Arc::new(ConnectivityFlag::new(true));
//! let outbox = Outbox::new(store, gate, ReplayConfig::default());
//!
//! outbox.register(
//!     MutationKind::ItemAdd,
//!     handler_fn(|_m: Mutation| async { Ok::<_, HandlerError>(Outcome::Applied) }),
//! );
//!
//! outbox
//!     .enqueue(Mutation::new("m-1", MutationKind::ItemAdd, json!({"name": "Milk"}), 0))
//!     .await?;
//! let report = outbox.drain().await;
//! assert_eq!(report.applied, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connectivity;
pub mod error;
pub mod handlers;
pub mod outbox;
pub mod queue_store;
pub mod storage;

pub use config::{Config, ConfigError, ReplayConfig, StorageLocation};
pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag, HttpProbe};
pub use error::{OutboxError, StorageError};
pub use handlers::{
    handler_fn, Dispatch, FnHandler, HandlerError, HandlerRegistry, HttpHandler, MutationHandler,
    Outcome,
};
pub use outbox::{DrainReport, Outbox};
pub use queue_store::{LoadState, QueueStore, DEFAULT_STORAGE_KEY};
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};

/// Milliseconds since the Unix epoch, for stamping new mutations.
pub fn now_millis() -> outbox_engine::Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
