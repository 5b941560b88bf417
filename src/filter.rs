//! Composite filter predicates.
//!
//! A predicate has two faces: the single *coarse* equality term the feed
//! transport can index server-side, and the full *fine-grained* predicate the
//! engine evaluates client-side on every event. Events delivered under the
//! coarse term may still fail the fine-grained predicate.

use crate::types::{RawRow, ViewEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A single equality term: `column = value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EqTerm {
    pub column: String,
    pub value: Value,
}

impl EqTerm {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A status-set membership term: `column IN (allowed...)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusFilter {
    pub column: String,
    pub allowed: BTreeSet<String>,
}

/// Composite filter: zero or more equality terms plus an optional status-set
/// membership term. At most one term is designated coarse; with no explicit
/// designation the first term is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    terms: Vec<EqTerm>,
    status: Option<StatusFilter>,
    coarse_column: Option<String>,
}

impl FilterPredicate {
    /// An empty predicate that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality term.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push(EqTerm::new(column, value));
        self
    }

    /// Add an equality term and designate its column as the coarse
    /// (server-side) filter. The caller should pick the most selective term.
    pub fn coarse_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        self.coarse_column = Some(column.clone());
        self.terms.push(EqTerm {
            column,
            value: value.into(),
        });
        self
    }

    /// Add a status-set membership term.
    pub fn statuses<I, S>(mut self, column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = Some(StatusFilter {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// The equality terms, in insertion order.
    pub fn terms(&self) -> &[EqTerm] {
        &self.terms
    }

    /// The status-set membership term, if any.
    pub fn status(&self) -> Option<&StatusFilter> {
        self.status.as_ref()
    }

    /// The single term the transport filters on server-side: the designated
    /// coarse column, or the first equality term.
    pub fn coarse_term(&self) -> Option<&EqTerm> {
        match &self.coarse_column {
            Some(column) => self.terms.iter().find(|t| &t.column == column),
            None => self.terms.first(),
        }
    }

    /// Whether two predicates resolve to the same coarse term. When they do,
    /// an existing subscription can be kept across the predicate change.
    pub fn same_coarse(&self, other: &FilterPredicate) -> bool {
        self.coarse_term() == other.coarse_term()
    }

    /// Evaluate the full fine-grained predicate against a transformed entity.
    pub fn matches<T: ViewEntity>(&self, entity: &T) -> bool {
        for term in &self.terms {
            match entity.field(&term.column) {
                Some(value) if value == term.value => {}
                _ => return false,
            }
        }
        if let Some(status) = &self.status {
            match entity.field(&status.column) {
                Some(Value::String(s)) if status.allowed.contains(&s) => {}
                _ => return false,
            }
        }
        true
    }

    /// Evaluate the full fine-grained predicate against a raw row. Used by
    /// snapshot sources, which filter before the transform runs.
    pub fn matches_row(&self, row: &RawRow) -> bool {
        for term in &self.terms {
            match row.get(&term.column) {
                Some(value) if *value == term.value => {}
                _ => return false,
            }
        }
        if let Some(status) = &self.status {
            match row.get(&status.column) {
                Some(Value::String(s)) if status.allowed.contains(s) => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, Timestamp};
    use serde_json::json;

    #[derive(Clone)]
    struct Probe {
        id: EntityId,
        site: String,
        status: String,
    }

    impl ViewEntity for Probe {
        fn id(&self) -> &EntityId {
            &self.id
        }

        fn recency_key(&self) -> Timestamp {
            Timestamp(0)
        }

        fn field(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::String(self.id.0.clone())),
                "site_id" => Some(Value::String(self.site.clone())),
                "status" => Some(Value::String(self.status.clone())),
                _ => None,
            }
        }
    }

    fn probe(site: &str, status: &str) -> Probe {
        Probe {
            id: EntityId::from("p-1"),
            site: site.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let predicate = FilterPredicate::new();
        assert!(predicate.matches(&probe("s1", "open")));
        assert!(predicate.coarse_term().is_none());
    }

    #[test]
    fn test_equality_and_status_terms() {
        let predicate = FilterPredicate::new()
            .eq("site_id", "s1")
            .statuses("status", ["open", "in_progress"]);

        assert!(predicate.matches(&probe("s1", "open")));
        assert!(predicate.matches(&probe("s1", "in_progress")));
        assert!(!predicate.matches(&probe("s1", "done")));
        assert!(!predicate.matches(&probe("s2", "open")));
    }

    #[test]
    fn test_missing_field_fails_term() {
        let predicate = FilterPredicate::new().eq("zone", "kitchen");
        assert!(!predicate.matches(&probe("s1", "open")));
    }

    #[test]
    fn test_coarse_term_designation() {
        let predicate = FilterPredicate::new()
            .eq("zone", "kitchen")
            .coarse_eq("site_id", "s1");
        assert_eq!(predicate.coarse_term().unwrap().column, "site_id");

        let implicit = FilterPredicate::new().eq("zone", "kitchen").eq("site_id", "s1");
        assert_eq!(implicit.coarse_term().unwrap().column, "zone");
    }

    #[test]
    fn test_same_coarse_ignores_secondary_terms() {
        let a = FilterPredicate::new()
            .coarse_eq("site_id", "s1")
            .statuses("status", ["open"]);
        let b = FilterPredicate::new()
            .coarse_eq("site_id", "s1")
            .statuses("status", ["done"]);
        let c = FilterPredicate::new().coarse_eq("site_id", "s2");

        assert!(a.same_coarse(&b));
        assert!(!a.same_coarse(&c));
    }

    #[test]
    fn test_matches_row() {
        let predicate = FilterPredicate::new()
            .eq("site_id", "s1")
            .statuses("status", ["open"]);
        let row = json!({"id": "x", "site_id": "s1", "status": "open"});
        assert!(predicate.matches_row(row.as_object().unwrap()));

        let row = json!({"id": "x", "site_id": "s1", "status": "done"});
        assert!(!predicate.matches_row(row.as_object().unwrap()));
    }
}
