//! Reconciliation rule tests over the generic engine.

use liveview::{
    reconcile::{self, Applied},
    BoundedOrderedStore, ChangeEvent, FilterPredicate, RawRow, RequestAdapter, RequestStatus,
    ServiceRequest,
};
use serde_json::json;

fn row(id: &str, status: &str, at: i64) -> RawRow {
    json!({
        "id": id,
        "status": status,
        "site_id": "s1",
        "created_at": at,
    })
    .as_object()
    .unwrap()
    .clone()
}

fn apply(
    store: &mut BoundedOrderedStore<ServiceRequest>,
    predicate: &FilterPredicate,
    event: ChangeEvent,
) -> Applied {
    reconcile::apply(store, &RequestAdapter, predicate, &event).unwrap()
}

fn ids(store: &BoundedOrderedStore<ServiceRequest>) -> Vec<String> {
    store.iter().map(|r| r.id.as_str().to_string()).collect()
}

#[test]
fn capacity_eviction_drops_oldest_tail() {
    let mut store = BoundedOrderedStore::new(3);
    let predicate = FilterPredicate::new();

    for (i, id) in ["A", "B", "C", "D"].iter().enumerate() {
        apply(
            &mut store,
            &predicate,
            ChangeEvent::insert(row(id, "open", i as i64)).unwrap(),
        );
    }

    assert_eq!(ids(&store), ["D", "C", "B"]);
}

#[test]
fn update_out_of_scope_removes() {
    let mut store = BoundedOrderedStore::new(10);
    let predicate = FilterPredicate::new().statuses("status", ["open"]);

    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("X", "open", 1)).unwrap(),
    );
    assert_eq!(store.len(), 1);

    let applied = apply(
        &mut store,
        &predicate,
        ChangeEvent::update(row("X", "closed", 1)).unwrap(),
    );
    assert_eq!(applied, Applied::Removed);
    assert!(store.is_empty());
}

#[test]
fn update_for_unseen_id_is_implicit_insert() {
    let mut store = BoundedOrderedStore::new(2);
    let predicate = FilterPredicate::new().statuses("status", ["open"]);

    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("A", "open", 1)).unwrap(),
    );
    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("B", "open", 2)).unwrap(),
    );

    let applied = apply(
        &mut store,
        &predicate,
        ChangeEvent::update(row("Y", "open", 3)).unwrap(),
    );
    assert_eq!(applied, Applied::Inserted);
    // Newly visible at the front, oldest tail evicted to hold capacity.
    assert_eq!(ids(&store), ["Y", "B"]);
}

#[test]
fn delete_unknown_id_is_noop() {
    let mut store = BoundedOrderedStore::new(3);
    let predicate = FilterPredicate::new();

    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("A", "open", 1)).unwrap(),
    );
    let before = ids(&store);

    let applied = apply(&mut store, &predicate, ChangeEvent::delete_id("Z".into()));
    assert_eq!(applied, Applied::Skipped);
    assert_eq!(ids(&store), before);
}

#[test]
fn insert_then_delete_restores_previous_state() {
    let mut store = BoundedOrderedStore::new(5);
    let predicate = FilterPredicate::new();

    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("A", "open", 1)).unwrap(),
    );
    let before = ids(&store);

    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("B", "open", 2)).unwrap(),
    );
    apply(&mut store, &predicate, ChangeEvent::delete_id("B".into()));

    assert_eq!(ids(&store), before);
}

#[test]
fn update_in_place_preserves_position() {
    let mut store = BoundedOrderedStore::new(5);
    let predicate = FilterPredicate::new().statuses("status", ["open", "in_progress"]);

    for (i, id) in ["A", "B", "C"].iter().enumerate() {
        apply(
            &mut store,
            &predicate,
            ChangeEvent::insert(row(id, "open", i as i64)).unwrap(),
        );
    }
    assert_eq!(ids(&store), ["C", "B", "A"]);

    // A routine field update must not move the entity to the front.
    let applied = apply(
        &mut store,
        &predicate,
        ChangeEvent::update(row("B", "in_progress", 1)).unwrap(),
    );
    assert_eq!(applied, Applied::Replaced);
    assert_eq!(ids(&store), ["C", "B", "A"]);
    assert_eq!(
        store.iter().nth(1).unwrap().status,
        RequestStatus::InProgress
    );
}

#[test]
fn scope_round_trip_readds_at_front() {
    let mut store = BoundedOrderedStore::new(5);
    let predicate = FilterPredicate::new().statuses("status", ["open"]);

    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("A", "open", 1)).unwrap(),
    );
    apply(
        &mut store,
        &predicate,
        ChangeEvent::insert(row("B", "open", 2)).unwrap(),
    );

    // A leaves scope, then comes back: re-added as newly visible, at the front.
    apply(
        &mut store,
        &predicate,
        ChangeEvent::update(row("A", "closed", 1)).unwrap(),
    );
    assert_eq!(ids(&store), ["B"]);

    let applied = apply(
        &mut store,
        &predicate,
        ChangeEvent::update(row("A", "open", 1)).unwrap(),
    );
    assert_eq!(applied, Applied::Inserted);
    assert_eq!(ids(&store), ["A", "B"]);
}

#[test]
fn replaying_events_over_known_ids_never_duplicates() {
    let mut store = BoundedOrderedStore::new(100);
    let predicate = FilterPredicate::new();

    for i in 0..10 {
        apply(
            &mut store,
            &predicate,
            ChangeEvent::insert(row(&format!("id-{i}"), "open", i)).unwrap(),
        );
    }

    // 500 buffered events over the same ten ids, alternating kinds.
    for round in 0..500 {
        let id = format!("id-{}", round % 10);
        let event = if round % 2 == 0 {
            ChangeEvent::insert(row(&id, "open", round)).unwrap()
        } else {
            ChangeEvent::update(row(&id, "open", round)).unwrap()
        };
        apply(&mut store, &predicate, event);
    }

    let mut seen = ids(&store);
    seen.sort();
    seen.dedup();
    assert_eq!(store.len(), 10);
    assert_eq!(seen.len(), 10);
}
