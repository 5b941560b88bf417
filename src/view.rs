//! Synced views: the lifecycle controller tying snapshot, feed, store, and
//! stats together behind the consumer-facing contract.

use crate::entities::EntityAdapter;
use crate::error::Result;
use crate::feed::{ChangeFeed, FeedChannel, LiveToken, SubscriptionHandle, SubscriptionIntent};
use crate::filter::FilterPredicate;
use crate::reconcile;
use crate::snapshot::{self, SnapshotSource};
use crate::stats::StatsProjector;
use crate::store::BoundedOrderedStore;
use crate::types::{ConnectionState, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Tuning knobs for a synced view.
#[derive(Clone, Debug)]
pub struct ViewConfig {
    /// Max buffered events per subscription before the transport drops the
    /// channel.
    pub channel_buffer: usize,

    /// Upper bound on a snapshot fetch before it fails with a timeout.
    pub fetch_timeout: Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// State shared between the view and its apply worker.
struct Shared<A: EntityAdapter> {
    state: RwLock<ViewState<A>>,
    connection: RwLock<ConnectionState>,
}

impl<A: EntityAdapter> Shared<A> {
    fn set_connection(&self, next: ConnectionState) {
        let mut current = self.connection.write();
        if *current != next {
            let prev = *current;
            *current = next;
            debug!(from = %prev, to = %next, "connection state changed");
        }
    }
}

struct ViewState<A: EntityAdapter> {
    store: BoundedOrderedStore<A::Entity>,
    stats: A::Stats,
    predicate: FilterPredicate,
    last_update: Option<Timestamp>,
    error: Option<String>,
    loading: bool,
}

/// A bounded, filtered, ordered collection kept consistent with a change
/// feed, plus its derived statistics and connection status.
///
/// One view owns one subscription generation at a time. Events apply on a
/// dedicated worker thread in feed-delivery order; readers only observe
/// committed snapshots.
///
/// `attach` succeeds even when the initial snapshot or subscription fails:
/// fetch failures surface through [`error`](SyncedView::error) and are
/// recovered with [`refresh`](SyncedView::refresh); subscription failures
/// surface through the connection state.
pub struct SyncedView<A: EntityAdapter> {
    adapter: Arc<A>,
    feed: Arc<dyn ChangeFeed>,
    source: Arc<dyn SnapshotSource>,
    config: ViewConfig,
    shared: Arc<Shared<A>>,
    handle: Mutex<Option<SubscriptionHandle>>,
}

impl<A: EntityAdapter> SyncedView<A> {
    /// Open a view: subscribe to the feed, load the initial snapshot, and
    /// start applying live events.
    pub fn attach(
        adapter: A,
        feed: Arc<dyn ChangeFeed>,
        source: Arc<dyn SnapshotSource>,
        predicate: FilterPredicate,
    ) -> Result<Self> {
        Self::attach_with(adapter, feed, source, predicate, ViewConfig::default())
    }

    /// [`attach`](SyncedView::attach) with explicit tuning knobs.
    pub fn attach_with(
        adapter: A,
        feed: Arc<dyn ChangeFeed>,
        source: Arc<dyn SnapshotSource>,
        predicate: FilterPredicate,
        config: ViewConfig,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: RwLock::new(ViewState {
                store: BoundedOrderedStore::new(adapter.capacity()),
                stats: A::Stats::default(),
                predicate,
                last_update: None,
                error: None,
                loading: true,
            }),
            connection: RwLock::new(ConnectionState::Idle),
        });

        let view = Self {
            adapter: Arc::new(adapter),
            feed,
            source,
            config,
            shared,
            handle: Mutex::new(None),
        };
        view.connect()?;
        Ok(view)
    }

    // --- Consumer-facing contract ---

    /// The committed collection. Cheap to clone; never observed
    /// mid-mutation.
    pub fn data(&self) -> Arc<[A::Entity]> {
        self.shared.state.read().store.snapshot()
    }

    /// Statistics projected from the committed collection.
    pub fn stats(&self) -> A::Stats {
        self.shared.state.read().stats.clone()
    }

    /// Whether the initial snapshot (or a post-predicate-change reload) is
    /// still in flight.
    pub fn loading(&self) -> bool {
        self.shared.state.read().loading
    }

    /// The last snapshot fetch failure, cleared by the next successful
    /// load.
    pub fn error(&self) -> Option<String> {
        self.shared.state.read().error.clone()
    }

    /// When the collection last changed (event applied or snapshot loaded).
    pub fn last_update(&self) -> Option<Timestamp> {
        self.shared.state.read().last_update
    }

    /// The active fine-grained predicate.
    pub fn predicate(&self) -> FilterPredicate {
        self.shared.state.read().predicate.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.connection.read()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Re-run the snapshot load with the current predicate and atomically
    /// replace the collection. The subscription is left untouched. On
    /// failure the last-known-good collection stays intact and the failure
    /// is also surfaced through [`error`](SyncedView::error).
    pub fn refresh(&self) -> Result<()> {
        let predicate = self.shared.state.read().predicate.clone();
        let loaded = self.load_snapshot(&predicate);

        let mut state = self.shared.state.write();
        match loaded {
            Ok(entities) => {
                Self::replace_collection(&mut state, &self.adapter, entities);
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Change the active filter.
    ///
    /// A coarse-term change closes the subscription, clears the collection,
    /// reloads the snapshot, and opens a fresh channel. A change confined
    /// to secondary terms keeps the subscription open: the snapshot is
    /// re-fetched as an authoritative re-sync and ongoing events are
    /// fine-grained-filtered against the new predicate.
    pub fn set_predicate(&self, predicate: FilterPredicate) -> Result<()> {
        let coarse_changed = !self.shared.state.read().predicate.same_coarse(&predicate);

        if coarse_changed {
            self.close_subscription();
            {
                let mut state = self.shared.state.write();
                state.predicate = predicate;
                state.store.clear();
                state.store.commit();
                state.stats = A::Stats::default();
                state.last_update = None;
                state.error = None;
                state.loading = true;
            }
            self.connect()
        } else {
            self.shared.state.write().predicate = predicate.clone();
            let loaded = self.load_snapshot(&predicate);

            let mut state = self.shared.state.write();
            match loaded {
                Ok(entities) => {
                    Self::replace_collection(&mut state, &self.adapter, entities);
                    Ok(())
                }
                Err(err) => {
                    state.error = Some(err.to_string());
                    Err(err)
                }
            }
        }
    }

    /// Close the subscription and discard the collection. Synchronous: once
    /// this returns, no event from the old channel can mutate state.
    pub fn detach(&self) {
        self.close_subscription();
        {
            let mut state = self.shared.state.write();
            state.store.clear();
            state.store.commit();
            state.stats = A::Stats::default();
            state.last_update = None;
        }
        self.shared.set_connection(ConnectionState::Idle);
    }

    // --- Lifecycle internals ---

    /// Subscribe, load the snapshot while events buffer in the channel,
    /// swap the snapshot in, then start draining the buffered and live
    /// events. The update-as-implicit-insert reconciliation rule makes the
    /// merge idempotent in either arrival order.
    fn connect(&self) -> Result<()> {
        self.shared.set_connection(ConnectionState::Connecting);
        let predicate = self.shared.state.read().predicate.clone();
        let intent = SubscriptionIntent::new(self.adapter.table(), &predicate);

        let channel = match self.feed.subscribe(&intent, self.config.channel_buffer) {
            Ok(channel) => Some(channel),
            Err(err) => {
                warn!(table = self.adapter.table(), error = %err, "subscribe failed");
                self.shared.set_connection(ConnectionState::Error);
                None
            }
        };

        let loaded = self.load_snapshot(&predicate);
        {
            let mut state = self.shared.state.write();
            state.loading = false;
            match loaded {
                Ok(entities) => Self::replace_collection(&mut state, &self.adapter, entities),
                Err(err) => state.error = Some(err.to_string()),
            }
        }

        if let Some(channel) = channel {
            let handle = SubscriptionHandle::open(channel.channel_id, intent.coarse.clone());
            let token = handle.token();
            self.spawn_worker(channel, token)?;
            *self.handle.lock() = Some(handle);
            self.shared.set_connection(ConnectionState::Connected);
        }
        Ok(())
    }

    fn load_snapshot(&self, predicate: &FilterPredicate) -> Result<Vec<A::Entity>> {
        snapshot::load(
            Arc::clone(&self.source),
            &*self.adapter,
            self.adapter.table(),
            predicate,
            self.adapter.capacity(),
            self.config.fetch_timeout,
        )
    }

    fn replace_collection(state: &mut ViewState<A>, adapter: &A, entities: Vec<A::Entity>) {
        state.store.replace_all(entities);
        let data = state.store.commit();
        state.stats = adapter.project(&data);
        state.last_update = Some(Timestamp::now());
        state.error = None;
        state.loading = false;
    }

    fn close_subscription(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.close();
            self.feed.unsubscribe(handle.channel_id());
        }
    }

    fn spawn_worker(&self, channel: FeedChannel, token: LiveToken) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let adapter = Arc::clone(&self.adapter);
        let table = self.adapter.table();
        thread::Builder::new()
            .name(format!("liveview-{table}"))
            .spawn(move || worker_loop(channel, token, shared, adapter))?;
        Ok(())
    }
}

impl<A: EntityAdapter> Drop for SyncedView<A> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Single-writer apply loop for one subscription generation. Exits when the
/// channel ends or the generation's token is revoked; a revoked token makes
/// any in-flight event a no-op before it can touch the store.
fn worker_loop<A: EntityAdapter>(
    channel: FeedChannel,
    token: LiveToken,
    shared: Arc<Shared<A>>,
    adapter: Arc<A>,
) {
    for event in channel.events.iter() {
        if !token.is_live() {
            return;
        }
        let mut guard = shared.state.write();
        if !token.is_live() {
            return;
        }
        let state = &mut *guard;
        match reconcile::apply(&mut state.store, &*adapter, &state.predicate, &event) {
            Ok(applied) if applied.mutated() => {
                let data = state.store.commit();
                state.stats = adapter.project(&data);
                state.last_update = Some(Timestamp::now());
                trace!(entity = %event.entity_id, ?applied, "event applied");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(entity = %event.entity_id, error = %err, "change event dropped");
            }
        }
    }

    // Channel ended without an explicit close: the transport shut us down.
    if token.is_live() {
        shared.set_connection(ConnectionState::Disconnected);
        debug!("feed channel closed by transport");
    }
}
