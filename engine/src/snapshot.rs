//! Persisted layout of the mutation queue.
//!
//! The queue is stored as one JSON document under a single storage key:
//!
//! ```json
//! {"formatVersion": 1, "mutations": [ ... ]}
//! ```
//!
//! Older clients wrote a bare array of mutations with no version field; that
//! layout is still accepted on decode. Individual entries that fail to decode
//! are skipped and reported instead of discarding the whole queue.

use crate::{error::Result, Error, Mutation};
use serde::{Deserialize, Serialize};

/// Version of the persisted queue format.
pub const QUEUE_FORMAT_VERSION: u32 = 1;

/// The versioned on-disk form of the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Persisted format version
    pub format_version: u32,
    /// Queued mutations in replay order
    pub mutations: Vec<Mutation>,
}

/// An entry that could not be decoded and was left out of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position in the persisted list
    pub index: usize,
    /// Id of the entry, if it had a readable one
    pub id: Option<String>,
    /// Decoder error
    pub reason: String,
}

/// Result of decoding a persisted queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedQueue {
    /// Format version found, `None` for the legacy bare-array layout
    pub format_version: Option<u32>,
    /// Entries that decoded, in order
    pub mutations: Vec<Mutation>,
    /// Entries that were dropped
    pub skipped: Vec<SkippedEntry>,
}

impl QueueSnapshot {
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self {
            format_version: QUEUE_FORMAT_VERSION,
            mutations,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Decode a persisted queue, tolerating bad entries and the legacy layout.
    pub fn decode(json: &str) -> Result<DecodedQueue> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        let (format_version, entries) = match value {
            serde_json::Value::Array(entries) => (None, entries),
            serde_json::Value::Object(mut object) => {
                let version = object
                    .get("formatVersion")
                    .and_then(serde_json::Value::as_u64)
                    .ok_or_else(|| Error::InvalidSnapshot("missing formatVersion".into()))?;
                let version = u32::try_from(version).unwrap_or(u32::MAX);

                if version > QUEUE_FORMAT_VERSION {
                    return Err(Error::UnsupportedFormatVersion {
                        found: version,
                        supported: QUEUE_FORMAT_VERSION,
                    });
                }

                match object.remove("mutations") {
                    Some(serde_json::Value::Array(entries)) => (Some(version), entries),
                    _ => return Err(Error::InvalidSnapshot("missing mutations list".into())),
                }
            }
            _ => {
                return Err(Error::InvalidSnapshot(
                    "expected an object or an array".into(),
                ))
            }
        };

        let mut decoded = DecodedQueue {
            format_version,
            ..DecodedQueue::default()
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let id = entry
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);

            match serde_json::from_value::<Mutation>(entry) {
                Ok(mutation) => decoded.mutations.push(mutation),
                Err(e) => decoded.skipped.push(SkippedEntry {
                    index,
                    id,
                    reason: e.to_string(),
                }),
            }
        }

        Ok(decoded)
    }
}
