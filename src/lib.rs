//! # Live View
//!
//! Bounded, filtered, ordered client-side collections kept consistent with
//! an append-only change feed, with aggregate statistics derived from the
//! collection after every mutation.
//!
//! ## Core Concepts
//!
//! - **Synced view**: a capacity-capped collection, ordered by recency,
//!   unique by id, every member matching the active filter
//! - **Coarse vs fine predicates**: the transport filters on one equality
//!   column server-side; the full predicate is re-checked per event
//! - **Reconciliation**: deterministic insert/update/delete rules, with
//!   in-place replacement for routine updates and implicit inserts for
//!   updates to unseen ids
//! - **Adapters**: per-entity transform tables, capacities, and stats
//!   projections over one shared engine
//!
//! ## Example
//!
//! ```ignore
//! use liveview::{FilterPredicate, InMemoryFeed, MemorySource, RequestAdapter, SyncedView};
//! use std::sync::Arc;
//!
//! let feed = Arc::new(InMemoryFeed::new());
//! let source = Arc::new(MemorySource::new());
//!
//! let predicate = FilterPredicate::new()
//!     .coarse_eq("site_id", "site-1")
//!     .statuses("status", ["open", "in_progress"]);
//!
//! let view = SyncedView::attach(RequestAdapter, feed.clone(), source, predicate)?;
//!
//! // Publish a change; the view reconciles it live.
//! feed.publish("requests", event);
//! let open_requests = view.data();
//! let stats = view.stats();
//! ```

pub mod entities;
pub mod error;
pub mod feed;
pub mod filter;
pub mod reconcile;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod transform;
pub mod types;
pub mod view;

// Re-exports
pub use entities::{
    ChecklistAdapter, ChecklistRun, ChecklistStats, CountStatus, EntityAdapter, ExpiryAdapter,
    ExpiryReport, ExpiryStats, ExpiryStatus, InventoryAdapter, InventoryCount, InventoryStats,
    RequestAdapter, RequestStats, RequestStatus, RunStatus, ServiceRequest,
};
pub use error::{Result, SyncError};
pub use feed::{
    ChangeFeed, ChannelId, FeedChannel, InMemoryFeed, LiveToken, SubscriptionHandle,
    SubscriptionIntent,
};
pub use filter::{EqTerm, FilterPredicate, StatusFilter};
pub use reconcile::Applied;
pub use snapshot::{MemorySource, SnapshotSource};
pub use stats::StatsProjector;
pub use store::BoundedOrderedStore;
pub use transform::{FieldDefault, FieldSpec, RowTransform};
pub use types::{
    ChangeEvent, ChangeKind, ConnectionState, EntityId, RawRow, Timestamp, ViewEntity,
};
pub use view::{SyncedView, ViewConfig};
