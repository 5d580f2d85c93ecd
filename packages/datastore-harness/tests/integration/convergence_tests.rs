//! Convergence timing tests
//!
//! Drives teardown against a backend whose deletes reach queries after a
//! fixed lag, using a virtual clock so deadlines are exact.

use std::time::Duration;

use ntest::timeout;
use serde_json::json;

use datastore_harness::datastore_core::{Clock, DatastoreClient, Entity, KeyPath};
use datastore_harness::{
    await_convergence, DeletedKeyLedger, HarnessConfig, HarnessError, Phase, Scanner,
};

use super::helpers::{harness, harness_with_config};

/// Deletes visible at 119s but gone at 120s converge without a timeout
#[timeout(5000)]
#[test]
fn test_converges_on_last_scan_before_deadline() {
    let mut h = harness(120_000);
    let mut scope = h.session.begin_test().unwrap();
    let a = scope
        .make_entity(KeyPath::root("SomeKind", "a"), [("foo", json!(1))])
        .unwrap()
        .into_key();
    let b = scope
        .make_entity(KeyPath::root("SomeKind", "b"), [("foo", json!(2))])
        .unwrap()
        .into_key();

    let report = scope.finish().unwrap();
    assert_eq!(report.elapsed, Duration::from_secs(120));
    assert_eq!(report.attempts, 121);

    // Subsequent scans no longer see the deleted keys
    let scanner = Scanner::from_config(h.session.config());
    let visible = scanner.all_entities(&h.store).unwrap();
    assert!(visible.is_empty());
    assert!(h.session.ledger().contains(&a));
    assert!(h.session.ledger().contains(&b));
}

/// Deletes still visible at the deadline produce a timeout naming them
#[timeout(5000)]
#[test]
fn test_times_out_listing_remaining_entities() {
    let mut h = harness(121_000);
    let mut scope = h.session.begin_test().unwrap();
    let a = scope
        .make_entity(KeyPath::root("SomeKind", "a"), [("foo", json!(1))])
        .unwrap()
        .into_key();

    match scope.finish() {
        Err(HarnessError::ConvergenceTimeout {
            elapsed,
            attempts,
            keys,
        }) => {
            assert_eq!(elapsed, Duration::from_secs(120));
            assert_eq!(attempts, 121);
            assert_eq!(keys, vec![a]);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

/// An unrelated entity fails teardown at once instead of at the deadline
#[timeout(5000)]
#[test]
fn test_unrelated_entity_fails_immediately() {
    let mut h = harness(30_000);
    let store = h.store.clone();
    let mut scope = h.session.begin_test().unwrap();
    scope
        .make_entity(KeyPath::root("SomeKind", "a"), [("foo", json!(1))])
        .unwrap();

    let c = store.key(KeyPath::root("SomeKind", "c")).unwrap();
    store.put(Entity::new(c.clone())).unwrap();

    match scope.finish() {
        Err(HarnessError::UnexpectedLeftovers { phase, keys }) => {
            assert_eq!(phase, Phase::Teardown);
            assert_eq!(keys, vec![c]);
        }
        other => panic!("expected leftovers, got {:?}", other),
    }
    assert_eq!(h.clock.now(), Duration::ZERO);
}

/// The deadline comes from configuration, not a fixed constant
#[timeout(5000)]
#[test]
fn test_configured_deadline_is_honoured() {
    let config = HarnessConfig {
        poll_interval_ms: 500,
        convergence_deadline_ms: 10_000,
        ..Default::default()
    };
    let mut h = harness_with_config(30_000, config);
    let mut scope = h.session.begin_test().unwrap();
    scope
        .make_entity(KeyPath::root("SomeKind", 1), [("foo", json!(1))])
        .unwrap();

    match scope.finish() {
        Err(HarnessError::ConvergenceTimeout {
            elapsed, attempts, ..
        }) => {
            assert_eq!(elapsed, Duration::from_secs(10));
            assert_eq!(attempts, 21);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

/// The poller works on a bare ledger and client, outside any session
#[timeout(5000)]
#[test]
fn test_poller_runs_standalone() {
    let h = harness(4_000);
    let key = h.store.key(KeyPath::root("SomeKind", 1)).unwrap();
    h.store.put(Entity::new(key.clone())).unwrap();
    h.store.delete(&key).unwrap();

    let mut ledger = DeletedKeyLedger::new();
    ledger.record([key]);

    let config = HarnessConfig::default();
    let report = await_convergence(
        &h.store,
        &Scanner::from_config(&config),
        &ledger,
        h.clock.as_ref(),
        config.poll_policy(),
    )
    .unwrap();
    assert_eq!(report.attempts, 5);
    assert_eq!(h.clock.now(), Duration::from_secs(4));
}
