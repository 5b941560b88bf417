//! Snapshot loading: the initial (and refresh) read of a synced collection.

use crate::error::{Result, SyncError};
use crate::filter::FilterPredicate;
use crate::transform::RowTransform;
use crate::types::{RawRow, ViewEntity};
use crossbeam_channel::{bounded, RecvTimeoutError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// A read-only query interface over the authoritative store.
pub trait SnapshotSource: Send + Sync {
    /// Fetch raw rows for a table matching the full predicate, up to
    /// `limit`. Ordering is not required; the loader sorts.
    fn fetch(&self, table: &str, predicate: &FilterPredicate, limit: usize) -> Result<Vec<RawRow>>;
}

/// Fetch and transform a snapshot page: rows are transformed, filtered
/// against the predicate, sorted by recency key descending, and truncated
/// to `limit`.
///
/// The fetch runs on a helper thread and is bounded by `timeout`; a hung
/// source surfaces as [`SyncError::FetchTimeout`] instead of blocking the
/// caller indefinitely. There is no implicit retry: a failure is the
/// terminal result for this call.
///
/// Rows that fail the transform are dropped with a warning; a bad row never
/// fails the whole snapshot.
pub fn load<X: RowTransform>(
    source: Arc<dyn SnapshotSource>,
    transform: &X,
    table: &str,
    predicate: &FilterPredicate,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<X::Entity>> {
    let (tx, rx) = bounded(1);
    {
        let source = Arc::clone(&source);
        let table = table.to_string();
        let predicate = predicate.clone();
        thread::Builder::new()
            .name("snapshot-fetch".to_string())
            .spawn(move || {
                let _ = tx.send(source.fetch(&table, &predicate, limit));
            })?;
    }

    let rows = match rx.recv_timeout(timeout) {
        Ok(fetched) => fetched?,
        Err(RecvTimeoutError::Timeout) => return Err(SyncError::FetchTimeout),
        Err(RecvTimeoutError::Disconnected) => {
            return Err(SyncError::Fetch("snapshot source dropped".to_string()))
        }
    };

    let mut entities = Vec::with_capacity(rows.len().min(limit));
    for row in &rows {
        match transform.transform(row) {
            Ok(entity) => {
                if predicate.matches(&entity) {
                    entities.push(entity);
                }
            }
            Err(err) => warn!(table, error = %err, "snapshot row dropped"),
        }
    }

    entities.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
    entities.truncate(limit);
    Ok(entities)
}

/// In-memory snapshot source for tests and local wiring: a table name maps
/// to its raw rows.
pub struct MemorySource {
    tables: RwLock<HashMap<String, Vec<RawRow>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Replace a table's rows.
    pub fn set_rows(&self, table: impl Into<String>, rows: Vec<RawRow>) {
        self.tables.write().insert(table.into(), rows);
    }

    /// Append one row to a table.
    pub fn push_row(&self, table: &str, row: RawRow) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for MemorySource {
    fn fetch(&self, table: &str, predicate: &FilterPredicate, limit: usize) -> Result<Vec<RawRow>> {
        let tables = self.tables.read();
        let rows = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| predicate.matches_row(row))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}
