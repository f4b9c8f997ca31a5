//! Observer bus for diagnostics and menu publication.
//!
//! Subscribers get their own unbounded channel and stay registered until they
//! call `unsubscribe` or drop the receiver.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::codec::DecompressionStats;
use crate::menu::MenuItem;

/// Which tier served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Persistent,
    Remote,
}

/// Where a published menu came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSource {
    Cache,
    Remote,
    /// Nothing cached and the fetch failed.
    Empty,
}

#[derive(Debug, Clone)]
pub enum CatalogEvent {
    /// Every envelope received from the backend, before decoding.
    RawResponse {
        catalog: String,
        action: String,
        status_code: i64,
        message: String,
        compressed: bool,
    },
    Decompressed {
        catalog: String,
        stats: DecompressionStats,
    },
    CacheHit {
        catalog: String,
        tier: Tier,
    },
    CacheMiss {
        catalog: String,
    },
    /// A load finished after a newer one was requested and was ignored.
    LoadDiscarded {
        catalog: String,
        generation: u64,
        current: u64,
    },
    MenuPublished {
        menu: Arc<Vec<MenuItem>>,
        source: MenuSource,
    },
    /// Blocking notification: no cached menu and the fetch failed.
    MenuUnavailable,
    RepaintRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<CatalogEvent>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<CatalogEvent>)>,
}

#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn publish(&self, event: CatalogEvent) {
        let mut inner = self.lock();
        // Closed receivers are pruned here.
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}
