//! Reconciliation: applying one change event to a synced collection.
//!
//! All four entity types share these rules; the engine is parameterized by
//! the transform and the active fine-grained predicate, with capacity owned
//! by the store. Events are applied in feed-delivery order per entity id.

use crate::error::{Result, SyncError};
use crate::filter::FilterPredicate;
use crate::store::BoundedOrderedStore;
use crate::transform::RowTransform;
use crate::types::{ChangeEvent, ChangeKind, ViewEntity};

/// Outcome of applying a single change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Entity became visible: prepended, tail truncated to capacity.
    Inserted,
    /// Entity replaced in place, position preserved.
    Replaced,
    /// Entity removed from the collection.
    Removed,
    /// Event did not touch the collection (out of scope, or id absent).
    Skipped,
}

impl Applied {
    /// Whether the collection changed and stats must be recomputed.
    pub fn mutated(self) -> bool {
        self != Applied::Skipped
    }
}

/// Apply one change event under the full fine-grained predicate.
///
/// - Insert: transform `after`; in scope → prepend and truncate, out of
///   scope → skip. An insert for an id already present replaces in place,
///   so replaying events against a merged snapshot cannot duplicate.
/// - Update: out of scope → remove if present (idempotent); in scope and
///   absent → treat as newly visible (prepend, truncate); in scope and
///   present → replace in place. The in-place rule keeps an updated entity
///   at its current position so routine field updates do not reorder the
///   collection.
/// - Delete: remove by id; absent is a no-op, not an error.
///
/// An update for an id not yet present behaves as an implicit insert, which
/// makes merging a snapshot with already-buffered events idempotent
/// regardless of arrival order.
pub fn apply<X: RowTransform>(
    store: &mut BoundedOrderedStore<X::Entity>,
    transform: &X,
    predicate: &FilterPredicate,
    event: &ChangeEvent,
) -> Result<Applied> {
    match event.kind {
        ChangeKind::Insert => {
            let row = event
                .after
                .as_ref()
                .ok_or_else(|| SyncError::MalformedRow("insert event without a row".into()))?;
            let entity = transform.transform(row)?;
            if !predicate.matches(&entity) {
                return Ok(Applied::Skipped);
            }
            // An insert for an id already present (a snapshot row whose
            // insert event was buffered during the load) replaces in place
            // instead of duplicating.
            if store.replace(entity.clone()) {
                return Ok(Applied::Replaced);
            }
            store.prepend(entity);
            Ok(Applied::Inserted)
        }
        ChangeKind::Update => {
            let row = event
                .after
                .as_ref()
                .ok_or_else(|| SyncError::MalformedRow("update event without a row".into()))?;
            let entity = transform.transform(row)?;
            let matches_now = predicate.matches(&entity);
            let was_present = store.contains(entity.id());
            match (matches_now, was_present) {
                (false, true) => {
                    store.remove(entity.id());
                    Ok(Applied::Removed)
                }
                (false, false) => Ok(Applied::Skipped),
                (true, false) => {
                    store.prepend(entity);
                    Ok(Applied::Inserted)
                }
                (true, true) => {
                    store.replace(entity);
                    Ok(Applied::Replaced)
                }
            }
        }
        ChangeKind::Delete => {
            if store.remove(&event.entity_id).is_some() {
                Ok(Applied::Removed)
            } else {
                Ok(Applied::Skipped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{project_row, str_field, ts_field, FieldDefault, FieldSpec, RowTransform};
    use crate::types::{row_id, EntityId, RawRow, Timestamp};
    use serde_json::{json, Value};

    #[derive(Clone, Debug)]
    struct Ticket {
        id: EntityId,
        status: String,
        created_at: Timestamp,
    }

    impl ViewEntity for Ticket {
        fn id(&self) -> &EntityId {
            &self.id
        }

        fn recency_key(&self) -> Timestamp {
            self.created_at
        }

        fn field(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::String(self.id.0.clone())),
                "status" => Some(Value::String(self.status.clone())),
                _ => None,
            }
        }
    }

    struct TicketTransform;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec {
            target: "status",
            sources: &["status"],
            default: FieldDefault::EmptyString,
        },
        FieldSpec {
            target: "created_at",
            sources: &["created_at"],
            default: FieldDefault::Null,
        },
    ];

    impl RowTransform for TicketTransform {
        type Entity = Ticket;

        fn transform(&self, row: &RawRow) -> Result<Ticket> {
            let id = row_id(row)?;
            let fields = project_row(row, FIELDS);
            Ok(Ticket {
                id,
                status: str_field(&fields, "status"),
                created_at: ts_field(&fields, "created_at").unwrap_or_default(),
            })
        }
    }

    fn row(id: &str, status: &str, at: i64) -> RawRow {
        json!({"id": id, "status": status, "created_at": at})
            .as_object()
            .unwrap()
            .clone()
    }

    fn open_only() -> FilterPredicate {
        FilterPredicate::new().statuses("status", ["open"])
    }

    fn ids(store: &BoundedOrderedStore<Ticket>) -> Vec<String> {
        store.iter().map(|t| t.id.0.clone()).collect()
    }

    #[test]
    fn test_insert_in_scope_prepends() {
        let mut store = BoundedOrderedStore::new(3);
        let event = ChangeEvent::insert(row("a", "open", 1)).unwrap();
        let applied = apply(&mut store, &TicketTransform, &open_only(), &event).unwrap();
        assert_eq!(applied, Applied::Inserted);
        assert_eq!(ids(&store), ["a"]);
    }

    #[test]
    fn test_insert_out_of_scope_skipped() {
        let mut store = BoundedOrderedStore::new(3);
        let event = ChangeEvent::insert(row("a", "done", 1)).unwrap();
        let applied = apply(&mut store, &TicketTransform, &open_only(), &event).unwrap();
        assert_eq!(applied, Applied::Skipped);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_moving_out_of_scope_removes() {
        let mut store = BoundedOrderedStore::new(3);
        let predicate = open_only();
        let insert = ChangeEvent::insert(row("a", "open", 1)).unwrap();
        apply(&mut store, &TicketTransform, &predicate, &insert).unwrap();

        let update = ChangeEvent::update(row("a", "done", 1)).unwrap();
        let applied = apply(&mut store, &TicketTransform, &predicate, &update).unwrap();
        assert_eq!(applied, Applied::Removed);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_unknown_id_is_implicit_insert() {
        let mut store = BoundedOrderedStore::new(3);
        let event = ChangeEvent::update(row("y", "open", 5)).unwrap();
        let applied = apply(&mut store, &TicketTransform, &open_only(), &event).unwrap();
        assert_eq!(applied, Applied::Inserted);
        assert_eq!(ids(&store), ["y"]);
    }

    #[test]
    fn test_update_present_replaces_in_place() {
        let mut store = BoundedOrderedStore::new(3);
        let predicate = open_only();
        for (id, at) in [("a", 1), ("b", 2), ("c", 3)] {
            let event = ChangeEvent::insert(row(id, "open", at)).unwrap();
            apply(&mut store, &TicketTransform, &predicate, &event).unwrap();
        }

        let update = ChangeEvent::update(row("b", "open", 99)).unwrap();
        let applied = apply(&mut store, &TicketTransform, &predicate, &update).unwrap();
        assert_eq!(applied, Applied::Replaced);
        // Still [c, b, a]: a routine update must not move the entity.
        assert_eq!(ids(&store), ["c", "b", "a"]);
        assert_eq!(store.iter().nth(1).unwrap().created_at, Timestamp(99));
    }

    #[test]
    fn test_redundant_insert_replaces_in_place() {
        let mut store = BoundedOrderedStore::new(3);
        let predicate = open_only();
        for (id, at) in [("a", 1), ("b", 2)] {
            let event = ChangeEvent::insert(row(id, "open", at)).unwrap();
            apply(&mut store, &TicketTransform, &predicate, &event).unwrap();
        }

        let replay = ChangeEvent::insert(row("a", "open", 7)).unwrap();
        let applied = apply(&mut store, &TicketTransform, &predicate, &replay).unwrap();
        assert_eq!(applied, Applied::Replaced);
        assert_eq!(ids(&store), ["b", "a"]);
        assert_eq!(store.iter().nth(1).unwrap().created_at, Timestamp(7));
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut store = BoundedOrderedStore::<Ticket>::new(3);
        let event = ChangeEvent::delete_id(EntityId::from("ghost"));
        let applied = apply(&mut store, &TicketTransform, &open_only(), &event).unwrap();
        assert_eq!(applied, Applied::Skipped);
    }

    #[test]
    fn test_malformed_row_is_error_not_panic() {
        let mut store = BoundedOrderedStore::<Ticket>::new(3);
        let mut event = ChangeEvent::insert(row("a", "open", 1)).unwrap();
        event.after = None;
        assert!(apply(&mut store, &TicketTransform, &open_only(), &event).is_err());
        assert!(store.is_empty());
    }
}
