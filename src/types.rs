//! Core types for the sync engine.

use crate::error::{Result, SyncError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A raw row as delivered by the remote store: arbitrary, possibly sparse,
/// externally shaped.
pub type RawRow = serde_json::Map<String, Value>;

/// Stable identifier for an entity in a synced collection.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

/// Extract the required id column from a raw row.
///
/// Ids arrive as strings or integers depending on the table; both normalize
/// to a string. A missing or empty id is the one transform failure that is
/// an error rather than a default.
pub fn row_id(row: &RawRow) -> Result<EntityId> {
    match row.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(EntityId(s.clone())),
        Some(Value::Number(n)) => Ok(EntityId(n.to_string())),
        _ => Err(SyncError::MissingId),
    }
}

/// Milliseconds since Unix epoch. Used as the recency key for ordering
/// synced collections.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp_millis())
    }

    /// Parse from an RFC 3339 string, with fallbacks for the naive
    /// datetime and date-only forms some tables deliver.
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Timestamp(dt.timestamp_millis()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Timestamp(naive.and_utc().timestamp_millis()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Some(Timestamp(naive.and_utc().timestamp_millis()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            return Some(Timestamp(midnight.and_utc().timestamp_millis()));
        }
        None
    }

    /// Parse from a JSON value: an RFC 3339 string or epoch milliseconds.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Timestamp::parse(s),
            Value::Number(n) => n.as_i64().map(Timestamp),
            _ => None,
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Kind of row-level mutation carried by a change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row-level change notification from the feed. Immutable.
///
/// `before` for a delete carries at least the id; `after` is present for
/// inserts and updates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub entity_id: EntityId,
    pub before: Option<RawRow>,
    pub after: Option<RawRow>,
}

impl ChangeEvent {
    /// An insert notification for a new row.
    pub fn insert(after: RawRow) -> Result<Self> {
        let entity_id = row_id(&after)?;
        Ok(Self {
            kind: ChangeKind::Insert,
            entity_id,
            before: None,
            after: Some(after),
        })
    }

    /// An update notification carrying the new row image.
    pub fn update(after: RawRow) -> Result<Self> {
        let entity_id = row_id(&after)?;
        Ok(Self {
            kind: ChangeKind::Update,
            entity_id,
            before: None,
            after: Some(after),
        })
    }

    /// An update notification carrying both row images.
    pub fn update_with_before(before: RawRow, after: RawRow) -> Result<Self> {
        let entity_id = row_id(&after)?;
        Ok(Self {
            kind: ChangeKind::Update,
            entity_id,
            before: Some(before),
            after: Some(after),
        })
    }

    /// A delete notification carrying the old row image.
    pub fn delete(before: RawRow) -> Result<Self> {
        let entity_id = row_id(&before)?;
        Ok(Self {
            kind: ChangeKind::Delete,
            entity_id,
            before: Some(before),
            after: None,
        })
    }

    /// A delete notification for which the transport only delivered the id.
    pub fn delete_id(entity_id: EntityId) -> Self {
        let mut before = RawRow::new();
        before.insert("id".to_string(), Value::String(entity_id.0.clone()));
        Self {
            kind: ChangeKind::Delete,
            entity_id,
            before: Some(before),
            after: None,
        }
    }

    /// The row image to reconcile against: `after` for inserts and updates,
    /// `before` for deletes.
    pub fn row(&self) -> Option<&RawRow> {
        self.after.as_ref().or(self.before.as_ref())
    }
}

/// Connection status of a view's change-feed subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A typed domain entity held in a synced collection.
///
/// Implementations are produced by a per-entity transform from a [`RawRow`]
/// and expose named fields so the fine-grained filter predicate can be
/// evaluated without knowing the concrete type.
pub trait ViewEntity: Clone + Send + Sync + 'static {
    /// Stable identifier, unique within the collection.
    fn id(&self) -> &EntityId;

    /// The field the collection is ordered by, non-increasing.
    fn recency_key(&self) -> Timestamp;

    /// Named field access for predicate evaluation. Returns `None` for
    /// columns the entity does not carry.
    fn field(&self, column: &str) -> Option<Value>;
}
