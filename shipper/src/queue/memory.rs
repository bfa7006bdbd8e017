use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::client::ClientId;
use crate::queue::{AckNotification, AckTx, Queue, QueueEntry};

#[derive(Default)]
struct Inner {
    entries: Vec<QueueEntry>,
    pending: HashMap<ClientId, usize>,
    ack_tx: Option<AckTx>,
    accepting: bool,
}

/// In-memory queue for testing and development purposes.
///
/// [`MemoryQueue`] stores all enqueued entries and exposes them for
/// inspection. Confirmations are driven manually through
/// [`MemoryQueue::confirm`], or automatically on enqueue when built with
/// [`MemoryQueue::with_auto_confirm`], which makes it behave like an
/// infinitely fast output.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Mutex<Inner>>,
    auto_confirm: bool,
}

impl MemoryQueue {
    /// Creates an empty queue with manual confirmation.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                accepting: true,
                ..Inner::default()
            })),
            auto_confirm: false,
        }
    }

    /// Creates a queue confirming every entry as soon as it is enqueued.
    pub fn with_auto_confirm() -> Self {
        let mut queue = Self::new();
        queue.auto_confirm = true;
        queue
    }

    /// Returns a copy of all entries enqueued so far.
    pub fn entries(&self) -> Vec<QueueEntry> {
        let inner = self.inner.lock().unwrap();
        inner.entries.clone()
    }

    /// Number of entries enqueued so far.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.entries.len()
    }

    /// Returns true when nothing was enqueued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Confirms up to `count` outstanding events of `client`, in enqueue
    /// order, reporting them through the registered ack channel.
    pub fn confirm(&self, client: ClientId, count: usize) {
        let mut inner = self.inner.lock().unwrap();
        let outstanding = inner.pending.get(&client).copied().unwrap_or(0);
        let confirmed = count.min(outstanding);
        if confirmed == 0 {
            return;
        }

        inner.pending.insert(client, outstanding - confirmed);
        send_ack(&inner, client, confirmed);
    }

    /// Confirms every outstanding event of every client.
    pub fn confirm_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        let drained: Vec<_> = inner
            .pending
            .iter()
            .filter(|(_, outstanding)| **outstanding > 0)
            .map(|(client, outstanding)| (*client, *outstanding))
            .collect();

        for (client, outstanding) in drained {
            inner.pending.insert(client, 0);
            send_ack(&inner, client, outstanding);
        }
    }

    /// Stops accepting entries; subsequent `enqueue` calls are refused.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.accepting = false;
    }
}

fn send_ack(inner: &Inner, client: ClientId, count: usize) {
    if let Some(ack_tx) = &inner.ack_tx {
        let _ = ack_tx.send(AckNotification { client, count });
    } else {
        debug!(client, count, "confirmation with no registered ack sender");
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue for MemoryQueue {
    fn enqueue(&self, entry: QueueEntry) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.accepting {
            return false;
        }

        let client = entry.client;
        inner.entries.push(entry);

        if self.auto_confirm {
            send_ack(&inner, client, 1);
        } else {
            *inner.pending.entry(client).or_insert(0) += 1;
        }

        true
    }

    fn register_ack_sender(&self, tx: AckTx) {
        let mut inner = self.inner.lock().unwrap();
        inner.ack_tx = Some(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn entry(client: ClientId) -> QueueEntry {
        QueueEntry {
            client,
            destination: "logs".to_string(),
            event: Event::new(Utc::now()),
        }
    }

    #[tokio::test]
    async fn reports_manual_confirmations_in_order() {
        let queue = MemoryQueue::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        queue.register_ack_sender(tx);

        assert!(queue.enqueue(entry(1)));
        assert!(queue.enqueue(entry(1)));
        assert!(queue.enqueue(entry(2)));

        queue.confirm(1, 2);
        queue.confirm(2, 1);

        let first = rx.recv().await.unwrap();
        assert_eq!((first.client, first.count), (1, 2));
        let second = rx.recv().await.unwrap();
        assert_eq!((second.client, second.count), (2, 1));
    }

    #[tokio::test]
    async fn clamps_confirmations_to_outstanding() {
        let queue = MemoryQueue::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        queue.register_ack_sender(tx);

        assert!(queue.enqueue(entry(1)));
        queue.confirm(1, 10);

        let ack = rx.recv().await.unwrap();
        assert_eq!(ack.count, 1);

        // Nothing remains, so further confirmations report nothing.
        queue.confirm(1, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn auto_confirm_acks_on_enqueue() {
        let queue = MemoryQueue::with_auto_confirm();
        let (tx, mut rx) = mpsc::unbounded_channel();
        queue.register_ack_sender(tx);

        assert!(queue.enqueue(entry(3)));

        let ack = rx.recv().await.unwrap();
        assert_eq!((ack.client, ack.count), (3, 1));
    }

    #[test]
    fn refuses_entries_after_close() {
        let queue = MemoryQueue::new();
        assert!(queue.enqueue(entry(1)));

        queue.close();
        assert!(!queue.enqueue(entry(1)));
        assert_eq!(queue.len(), 1);
    }
}
