use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::ack::{Acker, CloseSummary};
use crate::types::Event;

/// Atomically-gated acker guard enabling safe client close.
///
/// [`ClientAcker`] wraps exactly one inner acker behind a one-way `active`
/// flag. While active, admissions forward to the inner acker; once closed,
/// `add_event` always reports not-admitted and the inner acker sees no
/// further admissions. The transition is a single atomic store, so for any
/// interleaving of one close and one admission exactly one of
/// "admitted and tracked" or "rejected and untracked" happens.
///
/// Ack deliveries keep forwarding after close: events admitted before the
/// flag flipped still have confirmations in flight, and dropping those
/// would lose counts.
pub struct ClientAcker {
    active: AtomicBool,
    acker: Box<dyn Acker>,
}

impl ClientAcker {
    /// Wraps an inner acker into an active guard.
    pub fn lift(acker: Box<dyn Acker>) -> Self {
        Self {
            active: AtomicBool::new(true),
            acker,
        }
    }

    /// Returns true while the guard admits events.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Acker for ClientAcker {
    fn add_event(&self, event: &Event, published: bool) -> bool {
        // The load is sequentially consistent with the store in `close`:
        // whichever wins, the admission decision and the inner tracking
        // agree.
        if self.active.load(Ordering::SeqCst) {
            return self.acker.add_event(event, published);
        }

        false
    }

    fn ack_events(&self, n: usize) {
        self.acker.ack_events(n);
    }

    async fn close(&self) -> CloseSummary {
        self.active.store(false, Ordering::SeqCst);
        self.acker.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::{CountAcker, CountAckHandler};
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    fn counting() -> (Arc<ClientAcker>, Arc<Mutex<Vec<(usize, usize)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let handler: CountAckHandler = Arc::new(move |acked, dropped| {
            recorded.lock().unwrap().push((acked, dropped));
        });
        let guard = Arc::new(ClientAcker::lift(Box::new(CountAcker::new(handler))));
        (guard, calls)
    }

    fn event() -> Event {
        Event::new(Utc::now())
    }

    #[tokio::test]
    async fn rejects_admissions_after_close() {
        let (guard, _calls) = counting();

        assert!(guard.is_active());
        assert!(guard.add_event(&event(), true));

        guard.close().await;

        assert!(!guard.is_active());
        assert!(!guard.add_event(&event(), true));
    }

    #[tokio::test]
    async fn forwards_acks_after_close() {
        let (guard, calls) = counting();

        assert!(guard.add_event(&event(), true));
        let summary = guard.close().await;
        assert_eq!(summary.unacked, 1);

        // The confirmation for the pre-close admission still lands.
        guard.ack_events(1);
        assert_eq!(*calls.lock().unwrap(), vec![(1, 0)]);
    }

    #[tokio::test]
    async fn concurrent_close_and_admission_agree() {
        // Race one close against many admissions: every admission reported
        // as admitted must later be confirmable, every rejected one must
        // leave no trace in the counts.
        for _ in 0..64 {
            let (guard, calls) = counting();

            let publisher = {
                let guard = guard.clone();
                tokio::spawn(async move {
                    let mut admitted = 0;
                    for _ in 0..16 {
                        if guard.add_event(&event(), true) {
                            admitted += 1;
                        } else {
                            break;
                        }
                    }
                    admitted
                })
            };

            let closer = {
                let guard = guard.clone();
                tokio::spawn(async move { guard.close().await })
            };

            let admitted = publisher.await.unwrap();
            let _summary = closer.await.unwrap();

            guard.ack_events(admitted);
            let confirmed: usize = calls.lock().unwrap().iter().map(|(a, d)| a + d).sum();
            assert_eq!(confirmed, admitted);
        }
    }
}
