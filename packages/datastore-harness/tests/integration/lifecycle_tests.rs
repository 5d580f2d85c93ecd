//! Session lifecycle tests
//!
//! Several tests run back to back against one backend, the way a test module
//! shares a session.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use ntest::timeout;
use serde_json::json;

use datastore_harness::datastore_core::{Clock, DatastoreClient, Entity, KeyPath, Query};
use datastore_harness::{HarnessError, Phase};

use super::helpers::harness;

/// Empty store: guard passes and teardown needs a single scan
#[timeout(5000)]
#[test]
fn test_empty_store_passes_trivially() {
    let mut h = harness(10_000);
    let scope = h.session.begin_test().unwrap();
    let report = scope.finish().unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(h.clock.now(), Duration::ZERO);
}

/// Sequential tests tolerate each other's lagging deletes
#[timeout(5000)]
#[test]
fn test_sequential_tests_share_ledger() {
    let mut h = harness(3_000);

    for round in 0..3 {
        let mut scope = h.session.begin_test().unwrap();
        scope
            .make_entity(
                KeyPath::root("SomeKind", round),
                [("round", json!(round)), ("name", json!("entity"))],
            )
            .unwrap();
        scope
            .make_entity(
                KeyPath::root("Other", round).in_namespace("other-namespace"),
                [("round", json!(round))],
            )
            .unwrap();
        scope.finish().unwrap();
    }

    assert_eq!(h.session.ledger().len(), 6);
    assert_eq!(h.store.live_count(), 0);
    assert_eq!(h.clock.now(), Duration::from_secs(9));
}

/// Guard passes while earlier deletes are still visible to queries
#[timeout(5000)]
#[test]
fn test_guard_accepts_known_deleted_leftovers() {
    let mut h = harness(60_000);
    let key = h.store.key(KeyPath::root("SomeKind", "old")).unwrap();
    h.store.put(Entity::new(key.clone())).unwrap();
    assert_eq!(h.session.initial_clean().unwrap(), 1);

    // Still visible, but known deleted
    assert_eq!(h.store.query(&Query::kind("SomeKind")).unwrap().len(), 1);
    let scope = h.session.begin_test().unwrap();
    let report = scope.finish().unwrap();
    assert_eq!(report.elapsed, Duration::from_secs(60));
}

/// Guard refuses to start a test in a dirty store
#[timeout(5000)]
#[test]
fn test_guard_rejects_unknown_leftovers() {
    let mut h = harness(0);
    let other = h.store.with_namespace("other-namespace");
    let stray = other.key(KeyPath::root("Anything", 1)).unwrap();
    other.put(Entity::new(stray.clone())).unwrap();

    match h.session.begin_test() {
        Err(HarnessError::UnexpectedLeftovers { phase, keys }) => {
            assert_eq!(phase, Phase::Setup);
            assert_eq!(keys, vec![stray]);
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("guard should have failed"),
    };
}

/// Provisioned entity is absent before and present with its fields after
#[timeout(5000)]
#[test]
fn test_provisioned_entity_roundtrip() {
    let mut h = harness(0);
    let mut scope = h.session.begin_test().unwrap();

    let path = KeyPath::root("Parent", 1).child("SomeKind", "child");
    let key = scope.key(path.clone()).unwrap();
    assert!(scope.client().get(&key).unwrap().is_none());

    scope
        .make_entity(path, [("foo", json!(42)), ("bar", json!([1, 2, 3]))])
        .unwrap();
    let stored = scope.client().get(&key).unwrap().unwrap();
    assert_eq!(stored.get("foo"), Some(&json!(42)));
    assert_eq!(stored.get("bar"), Some(&json!([1, 2, 3])));

    scope.finish().unwrap();
    assert!(h.store.get(&key).unwrap().is_none());
}

/// Namespaced context sees entities provisioned in its namespace
#[timeout(5000)]
#[test]
fn test_client_context_reads_namespaced_entities() {
    let mut h = harness(0);
    let mut scope = h.session.begin_test().unwrap();
    scope
        .make_entity(
            KeyPath::root("SomeKind", 5).in_namespace("other-namespace"),
            [("foo", json!("bar"))],
        )
        .unwrap();

    {
        let context = scope.client_context("other-namespace");
        let key = context.key(KeyPath::root("SomeKind", 5)).unwrap();
        let entity = context.get(&key).unwrap().unwrap();
        assert_eq!(entity.get("foo"), Some(&json!("bar")));
        assert_eq!(context.query(Some("SomeKind")).unwrap().len(), 1);

        let default_context = scope.client_context("");
        assert!(default_context.query(None).unwrap().is_empty());
    }

    scope.finish().unwrap();
}

/// A failing test body still cleans up through the scope's drop
#[timeout(5000)]
#[test]
fn test_error_in_test_body_still_cleans_up() {
    let mut h = harness(2_000);

    let body = |h: &mut super::helpers::Harness| -> anyhow::Result<()> {
        let mut scope = h.session.begin_test()?;
        scope.make_entity(KeyPath::root("SomeKind", 1), [("foo", json!(1))])?;
        scope.make_entity(KeyPath::root("SomeKind", 1), [("foo", json!(2))])?;
        scope.finish()?;
        Ok(())
    };

    let err = body(&mut h).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::EntityAlreadyExists { .. })
    ));
    assert_eq!(h.store.live_count(), 0);
    assert_eq!(h.session.ledger().len(), 1);
    assert_eq!(h.clock.now(), Duration::from_secs(2));
}

/// A panicking test body still cleans up without a double panic
#[timeout(5000)]
#[test]
fn test_panic_in_test_body_still_cleans_up() {
    let mut h = harness(0);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut scope = h.session.begin_test().unwrap();
        scope
            .make_entity(KeyPath::root("SomeKind", 1), [("foo", json!(1))])
            .unwrap();
        panic!("assertion in test body");
    }));

    assert!(result.is_err());
    assert_eq!(h.store.live_count(), 0);
    assert_eq!(h.session.ledger().len(), 1);
    h.session.begin_test().unwrap().finish().unwrap();
}

/// Teardown failures during an unwind are logged instead of aborting
#[timeout(5000)]
#[test]
fn test_teardown_failure_during_panic_is_swallowed() {
    let mut h = harness(0);
    let store = h.store.clone();

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _scope = h.session.begin_test().unwrap();
        let stray = store.key(KeyPath::root("SomeKind", "stray")).unwrap();
        store.put(Entity::new(stray)).unwrap();
        panic!("assertion in test body");
    }));

    let payload = result.unwrap_err();
    assert_eq!(
        payload.downcast_ref::<&str>(),
        Some(&"assertion in test body")
    );
}
