//! Collapsing of redundant queued mutations.
//!
//! Rapid repeated edits to the same target (quantity taps, renames) would
//! otherwise grow the queue without bound. A mutation carrying a dedupe key
//! replaces the most recent queued mutation with the same `(type, dedupeKey)`
//! in place, so the user's final value is sent once and keeps the position of
//! the first edit relative to mutations on other entities.

use crate::Mutation;

/// What happened when a mutation was added to a queue.
#[derive(Debug, Clone, PartialEq)]
pub enum CollapseOutcome {
    /// The mutation was appended at `index`.
    Appended { index: usize },
    /// The mutation replaced `previous` at `index`.
    Replaced { index: usize, previous: Mutation },
}

impl CollapseOutcome {
    /// Index the new mutation now occupies.
    pub fn index(&self) -> usize {
        match self {
            CollapseOutcome::Appended { index } | CollapseOutcome::Replaced { index, .. } => *index,
        }
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, CollapseOutcome::Replaced { .. })
    }
}

/// Add `mutation` to `queue`, collapsing it into an earlier entry when allowed.
pub fn collapse_into(queue: &mut Vec<Mutation>, mutation: Mutation) -> CollapseOutcome {
    if !mutation.is_collapsible() {
        queue.push(mutation);
        return CollapseOutcome::Appended {
            index: queue.len() - 1,
        };
    }

    match queue.iter().rposition(|queued| queued.same_target(&mutation)) {
        Some(index) => {
            let previous = std::mem::replace(&mut queue[index], mutation);
            CollapseOutcome::Replaced { index, previous }
        }
        None => {
            queue.push(mutation);
            CollapseOutcome::Appended {
                index: queue.len() - 1,
            }
        }
    }
}

/// Return `existing` with `mutation` collapsed into it.
pub fn collapse(mut existing: Vec<Mutation>, mutation: Mutation) -> Vec<Mutation> {
    collapse_into(&mut existing, mutation);
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationKind;
    use serde_json::json;

    fn update(id: &str, key: &str, qty: u32) -> Mutation {
        Mutation::new(id, MutationKind::ItemUpdate, json!({"qty": qty}), 1000)
            .with_dedupe_key(key)
    }

    #[test]
    fn append_without_key() {
        let queue = vec![Mutation::new("a", MutationKind::ItemAdd, json!({}), 1)];
        let queue = collapse(
            queue,
            Mutation::new("b", MutationKind::ItemAdd, json!({}), 2),
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].id, "b");
    }

    #[test]
    fn replace_in_place_preserves_position() {
        let mut queue = vec![
            update("u1", "item-1", 1),
            Mutation::new("other", MutationKind::ListUpdate, json!({}), 2),
        ];

        let outcome = collapse_into(&mut queue, update("u2", "item-1", 5));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, "u2");
        assert_eq!(queue[0].payload["qty"], 5);
        assert_eq!(queue[1].id, "other");
        match outcome {
            CollapseOutcome::Replaced { index, previous } => {
                assert_eq!(index, 0);
                assert_eq!(previous.id, "u1");
            }
            other => panic!("expected replacement, got {:?}", other),
        }
    }

    #[test]
    fn different_kind_same_key_does_not_collapse() {
        let queue = vec![update("u1", "item-1", 1)];
        let toggle = Mutation::new("t1", MutationKind::ItemToggle, json!({}), 2)
            .with_dedupe_key("item-1");
        let queue = collapse(queue, toggle);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn append_only_ignores_key() {
        let snap = |id: &str| {
            Mutation::new(id, MutationKind::SnapshotAdd, json!({"price": 1.5}), 1)
                .with_dedupe_key("item-1")
        };
        let queue = collapse(collapse(Vec::new(), snap("s1")), snap("s2"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn replaces_most_recent_match() {
        // Two entries with the same target can only coexist if they were
        // persisted by an older build; the newest one is the one replaced.
        let mut queue = vec![update("u1", "k", 1), update("u2", "k", 2)];
        let outcome = collapse_into(&mut queue, update("u3", "k", 3));
        assert_eq!(outcome.index(), 1);
        assert_eq!(queue[0].id, "u1");
        assert_eq!(queue[1].id, "u3");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_at_most_one_entry_per_target(keys in proptest::collection::vec(0u8..4, 0..40)) {
                let mut queue = Vec::new();
                for (i, key) in keys.iter().enumerate() {
                    collapse_into(&mut queue, update(&format!("m{}", i), &format!("k{}", key), i as u32));
                }

                let mut seen = std::collections::HashSet::new();
                for m in &queue {
                    prop_assert!(seen.insert(m.dedupe_key.clone()));
                }
            }

            #[test]
            fn prop_last_write_survives_at_first_position(count in 1usize..20) {
                let mut queue = vec![Mutation::new("head", MutationKind::ListCreate, json!({}), 0)];
                for i in 0..count {
                    collapse_into(&mut queue, update(&format!("m{}", i), "k", i as u32));
                }

                prop_assert_eq!(queue.len(), 2);
                prop_assert_eq!(&queue[1].id, &format!("m{}", count - 1));
            }
        }
    }
}
