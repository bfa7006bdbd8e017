use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ack::{Acker, CloseSummary, CountAckHandler};
use crate::types::Event;

/// Tracks publish-order admission flags and reports `(acked, dropped)`
/// totals per confirmed batch.
///
/// Every admitted event pushes its `published` flag in publish order. Ack
/// signals consume published flags from the front; dropped flags consumed
/// on the way (and any left sitting at the new front) are reported with the
/// same callback invocation, so the running `acked + dropped` total always
/// converges on the number of admitted events. A dropped event admitted
/// while nothing published is pending is confirmed immediately, since no
/// ack will ever precede it.
pub struct CountAcker {
    handler: CountAckHandler,
    state: Mutex<CountState>,
}

#[derive(Default)]
struct CountState {
    /// Admission-ordered `published` flags not yet reported.
    entries: VecDeque<bool>,
    /// Number of `true` entries, tracked to make the immediate-drop
    /// decision O(1).
    published_pending: usize,
}

impl CountAcker {
    /// Creates a count acker invoking `handler` per confirmed batch.
    pub fn new(handler: CountAckHandler) -> Self {
        Self {
            handler,
            state: Mutex::new(CountState::default()),
        }
    }
}

#[async_trait]
impl Acker for CountAcker {
    fn add_event(&self, _event: &Event, published: bool) -> bool {
        let report_drop = {
            let mut state = self.state.lock().unwrap();
            if published {
                state.entries.push_back(true);
                state.published_pending += 1;
                false
            } else if state.published_pending == 0 {
                true
            } else {
                state.entries.push_back(false);
                false
            }
        };

        // The callback runs outside the lock so it may publish again.
        if report_drop {
            (self.handler)(0, 1);
        }

        true
    }

    fn ack_events(&self, n: usize) {
        let (acked, dropped) = {
            let mut state = self.state.lock().unwrap();

            let mut acked = 0;
            let mut dropped = 0;
            while acked < n {
                match state.entries.pop_front() {
                    Some(true) => {
                        acked += 1;
                        state.published_pending -= 1;
                    }
                    Some(false) => dropped += 1,
                    // More acks than admitted published events is a queue
                    // protocol violation; report what exists.
                    None => break,
                }
            }

            // Dropped entries now at the front can only ever ride along
            // with this batch; nothing published precedes them anymore.
            while matches!(state.entries.front(), Some(false)) {
                state.entries.pop_front();
                dropped += 1;
            }

            (acked, dropped)
        };

        if acked > 0 || dropped > 0 {
            (self.handler)(acked, dropped);
        }
    }

    async fn close(&self) -> CloseSummary {
        let state = self.state.lock().unwrap();
        CloseSummary {
            unacked: state.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording() -> (CountAckHandler, Arc<Mutex<Vec<(usize, usize)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let handler: CountAckHandler = Arc::new(move |acked, dropped| {
            recorded.lock().unwrap().push((acked, dropped));
        });
        (handler, calls)
    }

    fn event() -> Event {
        Event::new(Utc::now())
    }

    #[test]
    fn acked_and_dropped_totals_match_admissions() {
        let (handler, calls) = recording();
        let acker = CountAcker::new(handler);

        // Admission order: published, dropped, published, published.
        assert!(acker.add_event(&event(), true));
        assert!(acker.add_event(&event(), false));
        assert!(acker.add_event(&event(), true));
        assert!(acker.add_event(&event(), true));

        acker.ack_events(2);
        acker.ack_events(1);

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![(2, 1), (1, 0)]);

        let admitted = 4;
        let reported: usize = calls.iter().map(|(a, d)| a + d).sum();
        assert_eq!(reported, admitted);
    }

    #[test]
    fn drop_with_nothing_pending_is_confirmed_immediately() {
        let (handler, calls) = recording();
        let acker = CountAcker::new(handler);

        assert!(acker.add_event(&event(), false));
        assert_eq!(*calls.lock().unwrap(), vec![(0, 1)]);
    }

    #[test]
    fn trailing_drop_rides_with_preceding_ack() {
        let (handler, calls) = recording();
        let acker = CountAcker::new(handler);

        assert!(acker.add_event(&event(), true));
        assert!(acker.add_event(&event(), false));

        acker.ack_events(1);
        assert_eq!(*calls.lock().unwrap(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn close_reports_unconfirmed_entries() {
        let (handler, _calls) = recording();
        let acker = CountAcker::new(handler);

        assert!(acker.add_event(&event(), true));
        assert!(acker.add_event(&event(), true));
        acker.ack_events(1);

        let summary = acker.close().await;
        assert_eq!(summary.unacked, 1);
    }

    #[test]
    fn callback_runs_outside_the_lock() {
        // A handler that admits another event must not deadlock.
        let reentered = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Arc<CountAcker>>>> = Arc::new(Mutex::new(None));

        let handler: CountAckHandler = {
            let reentered = reentered.clone();
            let slot = slot.clone();
            Arc::new(move |_, _| {
                if reentered.fetch_add(1, Ordering::SeqCst) == 0
                    && let Some(acker) = slot.lock().unwrap().clone()
                {
                    acker.add_event(&event(), false);
                }
            })
        };

        let acker = Arc::new(CountAcker::new(handler));
        *slot.lock().unwrap() = Some(acker.clone());

        acker.add_event(&event(), false);
        assert_eq!(reentered.load(Ordering::SeqCst), 2);
    }
}
