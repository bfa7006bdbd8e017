use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::warn;

use crate::ack::{Acker, CloseSummary};
use crate::types::Event;

/// Close-time draining decorator for any acker.
///
/// [`WaitCloseAcker`] counts admitted published events that are still
/// unconfirmed. `close` first detaches the wrapped acker (flipping the
/// guard inside, so no new events are admitted), then suspends the caller
/// until the count drains to zero or the grace period elapses, whichever
/// comes first. The grace period is a timeout, not a hard deadline: on
/// expiry, close proceeds and the remaining events are reported lost.
pub struct WaitCloseAcker {
    inner: Box<dyn Acker>,
    grace: Duration,
    pending: AtomicUsize,
    closing: AtomicBool,
    drained: Notify,
}

impl WaitCloseAcker {
    /// Decorates `inner` with a close grace period.
    pub fn new(inner: Box<dyn Acker>, grace: Duration) -> Self {
        Self {
            inner,
            grace,
            pending: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            drained: Notify::new(),
        }
    }

    fn outstanding(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Acker for WaitCloseAcker {
    fn add_event(&self, event: &Event, published: bool) -> bool {
        let admitted = self.inner.add_event(event, published);
        if admitted && published {
            self.pending.fetch_add(1, Ordering::SeqCst);
        }

        admitted
    }

    fn ack_events(&self, n: usize) {
        self.inner.ack_events(n);

        let mut current = self.pending.load(Ordering::SeqCst);
        let drained = loop {
            let next = current.saturating_sub(n);
            match self
                .pending
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break next == 0,
                Err(observed) => current = observed,
            }
        };

        if drained && self.closing.load(Ordering::SeqCst) {
            self.drained.notify_waiters();
        }
    }

    async fn close(&self) -> CloseSummary {
        self.closing.store(true, Ordering::SeqCst);

        // Detach the wrapped acker first: the guard inside flips its
        // active flag here, so the pending count can only go down from now.
        let _ = self.inner.close().await;

        if self.outstanding() == 0 {
            return CloseSummary { unacked: 0 };
        }

        let wait = async {
            loop {
                // Register interest before re-checking so a concurrent
                // drain between the check and the await cannot be missed.
                let notified = self.drained.notified();
                if self.outstanding() == 0 {
                    return;
                }
                notified.await;
            }
        };

        if tokio::time::timeout(self.grace, wait).await.is_err() {
            let unacked = self.outstanding();
            warn!(unacked, "close grace period elapsed with unacknowledged events");
            return CloseSummary { unacked };
        }

        CloseSummary { unacked: 0 }
    }
}
