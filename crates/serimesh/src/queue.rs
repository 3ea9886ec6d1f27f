//! Outbound queue: bytes waiting for the single writer.
//!
//! Any number of producers (the announcement task, the read task when it
//! relays, the local user via `send_text`) push complete wire fragments.
//! One writer task drains them in order. Each item is written as one
//! unit, so fragments from different producers never interleave.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::warn;

use crate::{OverflowPolicy, QueueError};

/// A complete wire fragment: an announcement or a full envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundItem {
    wire_bytes: Vec<u8>,
}

impl OutboundItem {
    /// Wraps already-encoded bytes.
    pub fn new(wire_bytes: Vec<u8>) -> Self {
        Self { wire_bytes }
    }

    /// The bytes to write.
    pub fn as_bytes(&self) -> &[u8] {
        &self.wire_bytes
    }

    /// Number of bytes in the fragment.
    pub fn len(&self) -> usize {
        self.wire_bytes.len()
    }

    /// Whether the fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.wire_bytes.is_empty()
    }
}

impl From<Vec<u8>> for OutboundItem {
    fn from(wire_bytes: Vec<u8>) -> Self {
        Self::new(wire_bytes)
    }
}

struct Inner {
    items: Mutex<VecDeque<OutboundItem>>,
    capacity: usize,
    policy: OverflowPolicy,
    ready: Notify,
    dropped: AtomicU64,
}

/// Bounded multi-producer FIFO with an async wake-up for the consumer.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct OutboundQueue {
    inner: Arc<Inner>,
}

impl OutboundQueue {
    /// Creates an empty queue. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                capacity: capacity.max(1),
                policy,
                ready: Notify::new(),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Appends an item at the tail.
    ///
    /// # Errors
    /// With [`OverflowPolicy::Reject`], returns [`QueueError::Full`] when
    /// the queue is at capacity. With [`OverflowPolicy::DropOldest`] this
    /// never fails; the head item is discarded instead.
    pub fn enqueue(&self, item: OutboundItem) -> Result<(), QueueError> {
        {
            let mut items = self.lock();
            if items.len() >= self.inner.capacity {
                match self.inner.policy {
                    OverflowPolicy::Reject => {
                        return Err(QueueError::Full(self.inner.capacity));
                    }
                    OverflowPolicy::DropOldest => {
                        items.pop_front();
                        let total =
                            self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        warn!(
                            capacity = self.inner.capacity,
                            dropped = total,
                            "outbound queue full, dropped oldest item"
                        );
                    }
                }
            }
            items.push_back(item);
        }
        self.inner.ready.notify_one();
        Ok(())
    }

    /// Removes and returns every queued item, oldest first.
    pub fn drain_all(&self) -> Vec<OutboundItem> {
        std::mem::take(&mut *self.lock()).into()
    }

    /// Waits until at least one `enqueue` has happened since the last
    /// wake-up. Returns immediately if an enqueue raced ahead of the call.
    pub async fn wait(&self) {
        self.inner.ready.notified().await;
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Items discarded by [`OverflowPolicy::DropOldest`] so far.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<OutboundItem>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for OutboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundQueue")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("policy", &self.inner.policy)
            .finish()
    }
}
