//! Per-entity adapters for the four synced collections.
//!
//! Each adapter bundles what varies between entity types: the source table,
//! the collection capacity, the raw-row transform, and the stats
//! projection. Everything else — reconciliation rules, lifecycle, ordering,
//! capacity enforcement — is the shared engine.

mod checklist;
mod expiry;
mod inventory;
mod request;

pub use checklist::{ChecklistAdapter, ChecklistRun, ChecklistStats, RunStatus};
pub use expiry::{ExpiryAdapter, ExpiryReport, ExpiryStats, ExpiryStatus};
pub use inventory::{CountStatus, InventoryAdapter, InventoryCount, InventoryStats};
pub use request::{RequestAdapter, RequestStats, RequestStatus, ServiceRequest};

use crate::stats::StatsProjector;
use crate::transform::RowTransform;

/// Everything a synced view needs to know about one entity type.
pub trait EntityAdapter:
    RowTransform + StatsProjector<<Self as RowTransform>::Entity> + Send + Sync + 'static
{
    /// Source table of the change feed and snapshot queries.
    fn table(&self) -> &'static str;

    /// Collection capacity; also the snapshot page size.
    fn capacity(&self) -> usize;
}
