//! In-process change feed for tests and local wiring.

use crate::error::Result;
use crate::types::ChangeEvent;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::{ChangeFeed, ChannelId, FeedChannel, SubscriptionIntent};

/// Internal per-channel state.
struct FeedSub {
    intent: SubscriptionIntent,
    sender: Sender<ChangeEvent>,
}

impl FeedSub {
    /// Whether an event passes this channel's coarse term. The transport
    /// filters on the raw row image; an event whose row lacks the coarse
    /// column (a bare-id delete) is delivered, since the transport cannot
    /// evaluate it.
    fn matches(&self, event: &ChangeEvent) -> bool {
        let Some(term) = &self.intent.coarse else {
            return true;
        };
        match event.row().and_then(|row| row.get(&term.column)) {
            Some(value) => *value == term.value,
            None => true,
        }
    }
}

/// An in-memory feed transport: one publisher, any number of channels, each
/// coarse-filtered server-side. Slow channels are dropped rather than
/// blocking the publisher.
pub struct InMemoryFeed {
    subs: RwLock<HashMap<u64, FeedSub>>,
    next_id: AtomicU64,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self {
            subs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Publish a change event for a table. Delivered to every channel whose
    /// intent matches; channels with a full buffer are dropped.
    pub fn publish(&self, table: &str, event: ChangeEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subs.read();
            for (id, sub) in subs.iter() {
                if sub.intent.table != table || !sub.matches(&event) {
                    continue;
                }
                match sub.sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                        to_remove.push(*id);
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subs.write();
            for id in to_remove {
                if subs.remove(&id).is_some() {
                    warn!(channel = id, table, "feed channel dropped (buffer full)");
                }
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.read().len()
    }

    pub fn is_subscribed(&self, channel: ChannelId) -> bool {
        self.subs.read().contains_key(&channel.0)
    }
}

impl Default for InMemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for InMemoryFeed {
    fn subscribe(&self, intent: &SubscriptionIntent, buffer: usize) -> Result<FeedChannel> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = bounded(buffer);

        self.subs.write().insert(
            id,
            FeedSub {
                intent: intent.clone(),
                sender,
            },
        );

        Ok(FeedChannel {
            channel_id: ChannelId(id),
            events: receiver,
        })
    }

    fn unsubscribe(&self, channel: ChannelId) {
        self.subs.write().remove(&channel.0);
    }
}
