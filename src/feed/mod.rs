//! Change-feed subscriptions.
//!
//! A subscription is scoped by a [`SubscriptionIntent`]: the table plus at
//! most one coarse equality term, which is all the transport can filter
//! server-side. Events for rows that fail the full fine-grained predicate
//! still arrive and are filtered out during reconciliation.

mod memory;

pub use memory::InMemoryFeed;

use crate::error::Result;
use crate::filter::{EqTerm, FilterPredicate};
use crate::types::{ChangeEvent, Timestamp};
use crossbeam_channel::Receiver;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for an open feed channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

/// What a subscription is for, compared by value across predicate changes.
/// Two predicates with the same intent can share one subscription; a
/// different intent requires closing the old channel and opening a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionIntent {
    pub table: String,
    pub coarse: Option<EqTerm>,
}

impl SubscriptionIntent {
    pub fn new(table: impl Into<String>, predicate: &FilterPredicate) -> Self {
        Self {
            table: table.into(),
            coarse: predicate.coarse_term().cloned(),
        }
    }
}

/// An open channel of change events from the transport.
pub struct FeedChannel {
    pub channel_id: ChannelId,
    pub events: Receiver<ChangeEvent>,
}

/// A change-feed transport.
pub trait ChangeFeed: Send + Sync {
    /// Open a subscription for the given intent. Events begin buffering in
    /// the returned channel immediately.
    fn subscribe(&self, intent: &SubscriptionIntent, buffer: usize) -> Result<FeedChannel>;

    /// Close a channel. The transport stops delivering to it and drops its
    /// sender, which ends the receiver's stream.
    fn unsubscribe(&self, channel: ChannelId);
}

/// Cancellation token tied to a subscription generation. Checked before
/// every event application; once revoked, in-flight events become no-ops.
#[derive(Clone)]
pub struct LiveToken(Arc<AtomicBool>);

impl LiveToken {
    fn new() -> Self {
        LiveToken(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An owned subscription: channel identity, the coarse term it was opened
/// with, and the invalidation token for its events.
///
/// Exactly one handle exists per subscription generation; closing it is
/// synchronous and makes every later (or in-flight) event from the channel
/// a no-op.
pub struct SubscriptionHandle {
    channel_id: ChannelId,
    coarse: Option<EqTerm>,
    opened_at: Timestamp,
    token: LiveToken,
}

impl SubscriptionHandle {
    pub fn open(channel_id: ChannelId, coarse: Option<EqTerm>) -> Self {
        Self {
            channel_id,
            coarse,
            opened_at: Timestamp::now(),
            token: LiveToken::new(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn coarse(&self) -> Option<&EqTerm> {
        self.coarse.as_ref()
    }

    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    /// A clone of the invalidation token, for the worker applying events.
    pub fn token(&self) -> LiveToken {
        self.token.clone()
    }

    pub fn is_live(&self) -> bool {
        self.token.is_live()
    }

    /// Revoke the token. Synchronous: returns only after any event applied
    /// from this handle's channel will observe the revocation.
    pub fn close(&self) {
        self.token.revoke();
    }
}
