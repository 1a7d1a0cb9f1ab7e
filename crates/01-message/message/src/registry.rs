//! Per-connection channel registry.
//!
//! The routing layer looks channels up to deliver replies; the output
//! strategy never touches this table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;

use crate::error::{MessageError, MessageResult};
use crate::message::ChannelId;

struct ChannelEntry {
    reply_tx: Sender<Vec<u8>>,
    last_seen: Instant,
}

/// Registry mapping a local connection identity to its per-connection state.
pub struct ChannelTable {
    inner: RwLock<HashMap<ChannelId, ChannelEntry>>,
    next_id: AtomicU64,
}

impl ChannelTable {
    /// Creates an empty table. Channel ids start at 1; id 0 is the discard
    /// sentinel.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a channel with a bounded reply queue of `capacity` payloads.
    pub fn open(&self, capacity: usize) -> (ChannelId, Receiver<Vec<u8>>) {
        let id = ChannelId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = bounded(capacity);
        self.inner.write().insert(
            id,
            ChannelEntry {
                reply_tx: tx,
                last_seen: Instant::now(),
            },
        );
        (id, rx)
    }

    /// Closes a channel; returns whether it was open.
    pub fn close(&self, id: ChannelId) -> bool {
        self.inner.write().remove(&id).is_some()
    }

    /// Marks a channel as recently active.
    pub fn touch(&self, id: ChannelId) {
        if let Some(entry) = self.inner.write().get_mut(&id) {
            entry.last_seen = Instant::now();
        }
    }

    /// Time since the channel last showed activity.
    pub fn idle_for(&self, id: ChannelId) -> Option<Duration> {
        self.inner.read().get(&id).map(|e| e.last_seen.elapsed())
    }

    /// Delivers a reply payload to the owning channel, blocking while its
    /// queue is full.
    pub fn deliver(&self, id: ChannelId, payload: Vec<u8>) -> MessageResult<()> {
        // Clone the sender out so the table lock is not held across a
        // blocking send.
        let tx = {
            let inner = self.inner.read();
            let entry = inner.get(&id).ok_or(MessageError::UnknownChannel(id))?;
            entry.reply_tx.clone()
        };
        tx.send(payload).map_err(|_| MessageError::ChannelClosed(id))
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no channels are open.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Open, deliver, close: payloads arrive on the channel's receiver, and a
    /// closed channel is reported as unknown.
    #[test]
    fn open_deliver_close() {
        let table = ChannelTable::new();
        let (id, rx) = table.open(4);
        assert_eq!(table.len(), 1);

        table.deliver(id, b"hi".to_vec()).expect("deliver");
        assert_eq!(rx.recv().unwrap(), b"hi".to_vec());

        assert!(table.close(id));
        assert!(!table.close(id));
        let err = table.deliver(id, vec![]).unwrap_err();
        assert!(matches!(err, MessageError::UnknownChannel(_)));
    }

    /// Dropping the receiver turns deliveries into `ChannelClosed`.
    #[test]
    fn dropped_receiver_is_closed() {
        let table = ChannelTable::new();
        let (id, rx) = table.open(1);
        drop(rx);
        let err = table.deliver(id, b"late".to_vec()).unwrap_err();
        assert!(matches!(err, MessageError::ChannelClosed(c) if c == id));
    }

    /// Ids are unique and never reuse the discard sentinel.
    #[test]
    fn ids_skip_discard_sentinel() {
        let table = ChannelTable::new();
        let (a, _rx_a) = table.open(1);
        let (b, _rx_b) = table.open(1);
        assert_ne!(a, ChannelId::DISCARD);
        assert_ne!(b, ChannelId::DISCARD);
        assert_ne!(a, b);
    }
}
