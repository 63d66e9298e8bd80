//! Last-write-wins conflict resolution between local and remote records.
//!
//! Resolution is whole-record: the side with the later `updated_at` wins,
//! ties go to the remote side because a persisted remote record is
//! authoritative. A record without a parseable timestamp is treated as
//! written at the Unix epoch, so it loses to anything that has one.
//!
//! Append-only kinds (price snapshots) never conflict: both sides are kept and
//! the timestamp comparison is not consulted at all.

use crate::MutationKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field carrying the last-modified timestamp on versioned records.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// A record that can report when it was last modified.
pub trait Versioned {
    /// The last-modified time, or `None` if missing or unparseable.
    fn updated_at(&self) -> Option<DateTime<Utc>>;
}

impl<T: Versioned + ?Sized> Versioned for &T {
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        (**self).updated_at()
    }
}

impl Versioned for serde_json::Value {
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self.get(UPDATED_AT_FIELD)? {
            serde_json::Value::String(s) => parse_timestamp(s),
            serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        }
    }
}

/// Parse the timestamp shapes records are known to carry.
///
/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Which side of a local/remote pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Local,
    Remote,
}

/// How conflicts are settled for a mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPolicy {
    /// Later `updated_at` wins, ties favor remote
    LastWriteWins,
    /// Both sides are kept; there is nothing to resolve
    AppendBoth,
}

impl ResolutionPolicy {
    /// The policy for a mutation kind.
    pub fn for_kind(kind: MutationKind) -> Self {
        if kind.is_append_only() {
            ResolutionPolicy::AppendBoth
        } else {
            ResolutionPolicy::LastWriteWins
        }
    }

    /// Always true for appends: they skip the timestamp comparison entirely.
    pub fn keeps_both(&self) -> bool {
        matches!(self, ResolutionPolicy::AppendBoth)
    }
}

/// Outcome of resolving a pair for a specific mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    Winner(Side),
    KeepBoth,
}

/// Decide which side wins under last-write-wins.
pub fn winner<L: Versioned, R: Versioned>(local: &L, remote: &R) -> Side {
    let local_at = local.updated_at().unwrap_or_default();
    let remote_at = remote.updated_at().unwrap_or_default();

    if remote_at >= local_at {
        Side::Remote
    } else {
        Side::Local
    }
}

/// Return the winning record of a local/remote pair.
pub fn resolve<T: Versioned>(local: T, remote: T) -> T {
    match winner(&local, &remote) {
        Side::Remote => remote,
        Side::Local => local,
    }
}

/// Resolve a pair in the context of the mutation kind that produced it.
pub fn resolve_for<L: Versioned, R: Versioned>(
    kind: MutationKind,
    local: &L,
    remote: &R,
) -> Resolution {
    match ResolutionPolicy::for_kind(kind) {
        ResolutionPolicy::AppendBoth => Resolution::KeepBoth,
        ResolutionPolicy::LastWriteWins => Resolution::Winner(winner(local, remote)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_remote_wins() {
        let local = json!({"updated_at": "2024-01-01T00:00:00Z", "name": "local"});
        let remote = json!({"updated_at": "2024-01-02T00:00:00Z", "name": "remote"});
        assert_eq!(resolve(local, remote)["name"], "remote");
    }

    #[test]
    fn later_local_wins() {
        let local = json!({"updated_at": "2024-01-03T00:00:00Z", "name": "local"});
        let remote = json!({"updated_at": "2024-01-02T00:00:00Z", "name": "remote"});
        assert_eq!(resolve(local, remote)["name"], "local");
    }

    #[test]
    fn tie_favors_remote() {
        let local = json!({"updated_at": "2024-05-05T12:00:00Z", "name": "local"});
        let remote = json!({"updated_at": "2024-05-05T12:00:00Z", "name": "remote"});
        assert_eq!(winner(&local, &remote), Side::Remote);
    }

    #[test]
    fn tie_across_offsets_favors_remote() {
        let local = json!({"updated_at": "2024-05-05T14:00:00+02:00"});
        let remote = json!({"updated_at": "2024-05-05T12:00:00Z"});
        assert_eq!(winner(&local, &remote), Side::Remote);
    }

    #[test]
    fn missing_local_timestamp_loses() {
        let remote = json!({"updated_at": "2024-01-01T00:00:00Z"});
        assert_eq!(winner(&json!({}), &remote), Side::Remote);
    }

    #[test]
    fn missing_remote_timestamp_loses_to_any_valid_local() {
        let local = json!({"updated_at": "2001-01-01T00:00:00Z"});
        assert_eq!(winner(&local, &json!({"updated_at": "garbage"})), Side::Local);
    }

    #[test]
    fn both_missing_is_a_tie() {
        assert_eq!(winner(&json!({}), &json!(null)), Side::Remote);
    }

    #[test]
    fn naive_and_numeric_timestamps() {
        let local = json!({"updated_at": "2024-01-01 10:00:00.250"});
        let remote = json!({"updated_at": 1_704_103_200_000i64}); // 2024-01-01T10:00:00Z
        assert_eq!(winner(&local, &remote), Side::Local);

        assert_eq!(
            parse_timestamp("2024-01-01"),
            parse_timestamp("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn append_only_keeps_both() {
        let older = json!({"updated_at": "2020-01-01T00:00:00Z"});
        let newer = json!({"updated_at": "2024-01-01T00:00:00Z"});

        assert_eq!(
            resolve_for(MutationKind::SnapshotAdd, &newer, &older),
            Resolution::KeepBoth
        );
        assert!(ResolutionPolicy::for_kind(MutationKind::SnapshotAdd).keeps_both());
        assert_eq!(
            resolve_for(MutationKind::ItemUpdate, &newer, &older),
            Resolution::Winner(Side::Local)
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn record(millis: i64) -> serde_json::Value {
            json!({"updated_at": millis})
        }

        proptest! {
            #[test]
            fn prop_equal_timestamps_pick_remote(millis in 0i64..4_000_000_000_000) {
                prop_assert_eq!(winner(&record(millis), &record(millis)), Side::Remote);
            }

            #[test]
            fn prop_strictly_newer_side_wins(a in 0i64..4_000_000_000_000, b in 0i64..4_000_000_000_000) {
                prop_assume!(a != b);
                let expected = if a > b { Side::Local } else { Side::Remote };
                prop_assert_eq!(winner(&record(a), &record(b)), expected);
            }

            #[test]
            fn prop_timestamp_beats_missing(millis in 1i64..4_000_000_000_000) {
                prop_assert_eq!(winner(&record(millis), &json!({})), Side::Local);
            }
        }
    }
}
