//! Edge case tests for outbox-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use outbox_engine::{
    collapse, resolve, CollapseOutcome, Mutation, MutationKind, PendingQueue, QueueSnapshot,
    RetryDecision, RetryPolicy,
};
use serde_json::json;
use std::time::Duration;

fn item_update(id: &str, key: &str, qty: i64) -> Mutation {
    Mutation::new(id, MutationKind::ItemUpdate, json!({"qty": qty}), 1000).with_dedupe_key(key)
}

// ============================================================================
// Collapsing
// ============================================================================

#[test]
fn collapsing_many_updates_leaves_one_at_first_index() {
    let mut queue = PendingQueue::new();
    queue.enqueue(Mutation::new("list", MutationKind::ListCreate, json!({}), 1));
    queue.enqueue(item_update("u0", "item-1:qty", 0));
    queue.enqueue(Mutation::new("add", MutationKind::ItemAdd, json!({}), 2));

    for i in 1..50 {
        let outcome = queue.enqueue(item_update(&format!("u{}", i), "item-1:qty", i));
        assert!(outcome.is_replaced());
        assert_eq!(outcome.index(), 1);
    }

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.mutations()[1].id, "u49");
    assert_eq!(queue.mutations()[1].payload["qty"], 49);
    assert_eq!(queue.mutations()[2].id, "add");
}

#[test]
fn identical_snapshot_appends_never_collapse() {
    let snapshot = Mutation::new("s", MutationKind::SnapshotAdd, json!({"price": 2.49}), 1);
    let mut list = Vec::new();
    for i in 0..10 {
        let mut next = snapshot.clone();
        next.id = format!("s{}", i);
        list = collapse(list, next);
        assert_eq!(list.len(), i + 1);
    }
}

#[test]
fn empty_dedupe_key_still_collapses() {
    // An empty string is still a key; only an absent key disables collapsing.
    let mut queue = PendingQueue::new();
    queue.enqueue(item_update("a", "", 1));
    let outcome = queue.enqueue(item_update("b", "", 2));
    assert!(matches!(outcome, CollapseOutcome::Replaced { index: 0, .. }));
}

#[test]
fn collapsing_resets_retry_count() {
    // The replacement is a fresh intent; it does not inherit the old failures.
    let policy = RetryPolicy::new(5, Duration::from_millis(1));
    let mut queue = PendingQueue::new();
    queue.enqueue(item_update("a", "k", 1));
    queue.record_failure("a", &policy).unwrap();
    queue.record_failure("a", &policy).unwrap();

    queue.enqueue(item_update("b", "k", 2));
    assert_eq!(queue.mutations()[0].retries, 0);
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn resolve_missing_local_timestamp() {
    let remote = json!({"updated_at": "2024-01-01T00:00:00Z", "name": "remote"});
    let winner = resolve(json!({}), remote.clone());
    assert_eq!(winner, remote);
}

#[test]
fn resolve_with_fractional_seconds() {
    let local = json!({"updated_at": "2024-01-01T00:00:00.001Z", "side": "local"});
    let remote = json!({"updated_at": "2024-01-01T00:00:00Z", "side": "remote"});
    assert_eq!(resolve(local, remote)["side"], "local");
}

#[test]
fn resolve_non_object_records() {
    assert_eq!(resolve(json!("a"), json!("b")), json!("b"));
}

// ============================================================================
// Retry budget
// ============================================================================

#[test]
fn retries_never_reach_the_maximum() {
    let policy = RetryPolicy::new(4, Duration::from_millis(1));
    let mut queue = PendingQueue::new();
    queue.enqueue(Mutation::new("m", MutationKind::ItemAdd, json!({}), 1));

    let mut cycles = 0;
    loop {
        cycles += 1;
        match queue.record_failure("m", &policy).unwrap() {
            RetryDecision::Retry { retries, .. } => assert!(retries < policy.max_retries),
            RetryDecision::GiveUp => break,
        }
    }

    assert_eq!(cycles, 4);
    assert!(queue.is_empty());
}

// ============================================================================
// Persisted layout
// ============================================================================

#[test]
fn empty_queue_roundtrip() {
    let json = PendingQueue::new().to_snapshot().to_json().unwrap();
    let decoded = QueueSnapshot::decode(&json).unwrap();
    assert!(decoded.mutations.is_empty());
    assert!(decoded.skipped.is_empty());
}

#[test]
fn deeply_nested_payload_survives() {
    let mut payload = json!({"leaf": true});
    for _ in 0..50 {
        payload = json!({"nested": payload});
    }

    let mut queue = PendingQueue::new();
    queue.enqueue(Mutation::new("m", MutationKind::ListUpdate, payload.clone(), 1));

    let json = queue.to_snapshot().to_json().unwrap();
    let decoded = QueueSnapshot::decode(&json).unwrap();
    assert_eq!(decoded.mutations[0].payload, payload);
}

#[test]
fn unicode_ids_and_keys() {
    let mut queue = PendingQueue::new();
    queue.enqueue(item_update("ミルク-1", "商品:数量", 1));
    queue.enqueue(item_update("ミルク-2", "商品:数量", 2));

    let json = queue.to_snapshot().to_json().unwrap();
    let decoded = QueueSnapshot::decode(&json).unwrap();
    assert_eq!(decoded.mutations.len(), 1);
    assert_eq!(decoded.mutations[0].id, "ミルク-2");
}

#[test]
fn entry_with_wrong_field_types_is_skipped() {
    let json = json!({
        "formatVersion": 1,
        "mutations": [
            {"id": "ok", "type": "ITEM_ADD", "payload": {}, "createdAt": 1},
            {"id": "bad", "type": "ITEM_ADD", "payload": {}, "createdAt": "yesterday"},
            "not even an object"
        ]
    })
    .to_string();

    let decoded = QueueSnapshot::decode(&json).unwrap();
    assert_eq!(decoded.mutations.len(), 1);
    assert_eq!(decoded.skipped.len(), 2);
    assert_eq!(decoded.skipped[1].id, None);
}
