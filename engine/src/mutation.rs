//! Mutation types for expressing durable write intents.
//!
//! A mutation is recorded locally the moment the user acts and stays queued
//! until the remote store has applied it, rejected it as a conflict, or the
//! retry budget runs out.

use crate::{MutationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of operation kinds the queue knows how to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    ListCreate,
    ListUpdate,
    ListDelete,
    ItemAdd,
    ItemUpdate,
    /// Toggle an item's purchased flag.
    ItemToggle,
    ItemDelete,
    /// Append a price snapshot. Never collapsed, never conflict-resolved.
    SnapshotAdd,
}

impl MutationKind {
    /// Every kind, in declaration order.
    pub const ALL: [MutationKind; 8] = [
        MutationKind::ListCreate,
        MutationKind::ListUpdate,
        MutationKind::ListDelete,
        MutationKind::ItemAdd,
        MutationKind::ItemUpdate,
        MutationKind::ItemToggle,
        MutationKind::ItemDelete,
        MutationKind::SnapshotAdd,
    ];

    /// Wire name, as persisted in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::ListCreate => "LIST_CREATE",
            MutationKind::ListUpdate => "LIST_UPDATE",
            MutationKind::ListDelete => "LIST_DELETE",
            MutationKind::ItemAdd => "ITEM_ADD",
            MutationKind::ItemUpdate => "ITEM_UPDATE",
            MutationKind::ItemToggle => "ITEM_TOGGLE",
            MutationKind::ItemDelete => "ITEM_DELETE",
            MutationKind::SnapshotAdd => "SNAPSHOT_ADD",
        }
    }

    /// Append-only kinds are never collapsed, even when they carry a dedupe key.
    pub fn is_append_only(&self) -> bool {
        matches!(self, MutationKind::SnapshotAdd)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mutation kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mutation kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for MutationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        MutationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A single durable write intent awaiting remote application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    /// Idempotency key, assigned by the enqueuing caller
    pub id: MutationId,
    /// Operation kind
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// Operation-specific data, opaque to the queue
    pub payload: serde_json::Value,
    /// When the mutation was enqueued (milliseconds since epoch)
    pub created_at: Timestamp,
    /// Failed replay attempts so far
    #[serde(default)]
    pub retries: u32,
    /// Identity used to collapse redundant edits to the same target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,
}

impl Mutation {
    /// Create a new mutation with no dedupe key and zero retries.
    pub fn new(
        id: impl Into<MutationId>,
        kind: MutationKind,
        payload: serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            created_at,
            retries: 0,
            dedupe_key: None,
        }
    }

    /// Set the dedupe key.
    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    /// Whether this mutation may be replaced by a later one with the same target.
    pub fn is_collapsible(&self) -> bool {
        !self.kind.is_append_only() && self.dedupe_key.is_some()
    }

    /// Whether `other` addresses the same `(type, dedupeKey)` target as this one.
    pub fn same_target(&self, other: &Mutation) -> bool {
        self.kind == other.kind
            && self.dedupe_key.is_some()
            && self.dedupe_key == other.dedupe_key
    }
}
