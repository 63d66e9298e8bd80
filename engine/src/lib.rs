//! # Outbox Engine
//!
//! Core logic for an offline mutation queue.
//!
//! Local write intents are recorded as [`Mutation`]s, kept in a durable
//! ordered queue, and replayed against a remote store once connectivity
//! allows. This crate holds the parts of that pipeline that are pure and
//! deterministic; the async replay loop and storage backends live in
//! `outbox-worker`.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, network or clocks
//! - **Deterministic**: same inputs always produce the same queue
//! - **Testable**: pure functions, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Mutations
//!
//! A [`Mutation`] carries an idempotency id, a [`MutationKind`], an opaque
//! JSON payload, a creation timestamp, a retry counter and an optional
//! dedupe key.
//!
//! ### Collapsing
//!
//! [`collapse`] replaces an earlier queued mutation with the same
//! `(kind, dedupe_key)` in place, so rapid repeated edits leave one entry.
//! Append-only kinds ([`MutationKind::SnapshotAdd`]) are never collapsed.
//!
//! ### Conflict resolution
//!
//! [`resolve`] picks between a local and a remote record by their
//! `updated_at` timestamps. Ties go to the remote record; a missing
//! timestamp counts as the Unix epoch.
//!
//! ### Retries
//!
//! [`RetryPolicy`] decides whether a transiently failed mutation is kept and
//! how long to back off (`base_delay * 2^retries`).
//!
//! ## Quick Start
//!
//! ```rust
//! use outbox_engine::{Mutation, MutationKind, PendingQueue, QueueSnapshot};
//! use serde_json::json;
//!
//! let mut queue = PendingQueue::new();
//!
//! // Two quantity taps on the same item collapse into one entry
//! queue.enqueue(
//!     Mutation::new("m-1", MutationKind::ItemUpdate, json!({"qty": 2}), 1706745600000)
//!         .with_dedupe_key("item-1:qty"),
//! );
//! queue.enqueue(
//!     Mutation::new("m-2", MutationKind::ItemUpdate, json!({"qty": 3}), 1706745601000)
//!         .with_dedupe_key("item-1:qty"),
//! );
//! assert_eq!(queue.len(), 1);
//! assert_eq!(queue.mutations()[0].payload["qty"], 3);
//!
//! // Persist and restore
//! let json = queue.to_snapshot().to_json().unwrap();
//! let decoded = QueueSnapshot::decode(&json).unwrap();
//! assert_eq!(decoded.mutations, queue.mutations());
//! ```

pub mod collapse;
pub mod error;
pub mod mutation;
pub mod queue;
pub mod resolve;
pub mod retry;
pub mod snapshot;

// Re-export main types at crate root
pub use collapse::{collapse, collapse_into, CollapseOutcome};
pub use error::Error;
pub use mutation::{Mutation, MutationKind, UnknownKind};
pub use queue::PendingQueue;
pub use resolve::{
    parse_timestamp, resolve, resolve_for, winner, Resolution, ResolutionPolicy, Side, Versioned,
};
pub use retry::{RetryDecision, RetryPolicy};
pub use snapshot::{DecodedQueue, QueueSnapshot, SkippedEntry, QUEUE_FORMAT_VERSION};

/// Type aliases for clarity
pub type MutationId = String;
pub type Timestamp = u64;
