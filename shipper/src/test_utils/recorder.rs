use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::ack::{CountAckHandler, EventsAckHandler, LastEventAckHandler};
use crate::test_utils::event::tag_string;
use crate::test_utils::notify::TimedNotify;

/// How long recorders wait for expected callbacks before failing the test.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Records `(acked, dropped)` callback invocations of a count acker.
#[derive(Clone, Default)]
pub struct CountRecorder {
    calls: Arc<Mutex<Vec<(usize, usize)>>>,
    notify: Arc<Notify>,
}

impl CountRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler to connect a client with.
    pub fn handler(&self) -> CountAckHandler {
        let calls = self.calls.clone();
        let notify = self.notify.clone();
        Arc::new(move |acked, dropped| {
            calls.lock().unwrap().push((acked, dropped));
            // notify_one stores a permit, so a callback landing between a
            // waiter's check and its await is never missed.
            notify.notify_one();
        })
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }

    /// Sum of acked and dropped counts across all invocations.
    pub fn totals(&self) -> (usize, usize) {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .fold((0, 0), |(acked, dropped), (a, d)| {
                (acked + a, dropped + d)
            })
    }

    /// Waits until the combined acked + dropped total reaches `expected`.
    ///
    /// # Panics
    ///
    /// Panics when a callback takes longer than the wait timeout.
    pub async fn wait_for_total(&self, expected: usize) {
        let notified = TimedNotify::with_timeout(self.notify.clone(), WAIT_TIMEOUT);
        loop {
            let (acked, dropped) = self.totals();
            if acked + dropped >= expected {
                return;
            }
            notified.notified().await;
        }
    }
}

/// Records the correlation-tag batches of an event acker.
#[derive(Clone, Default)]
pub struct EventsRecorder {
    batches: Arc<Mutex<Vec<Vec<Option<String>>>>>,
    notify: Arc<Notify>,
}

impl EventsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler to connect a client with.
    pub fn handler(&self) -> EventsAckHandler {
        let batches = self.batches.clone();
        let notify = self.notify.clone();
        Arc::new(move |batch| {
            let tags = batch.iter().map(tag_string).collect();
            batches.lock().unwrap().push(tags);
            notify.notify_one();
        })
    }

    /// All recorded batches, in order, with tags rendered to strings.
    pub fn batches(&self) -> Vec<Vec<Option<String>>> {
        self.batches.lock().unwrap().clone()
    }

    /// Waits until `expected` tags were confirmed across all batches.
    ///
    /// # Panics
    ///
    /// Panics when a callback takes longer than the wait timeout.
    pub async fn wait_for_total(&self, expected: usize) {
        let notified = TimedNotify::with_timeout(self.notify.clone(), WAIT_TIMEOUT);
        loop {
            let total: usize = self.batches.lock().unwrap().iter().map(Vec::len).sum();
            if total >= expected {
                return;
            }
            notified.notified().await;
        }
    }
}

/// Records the per-batch last events seen by a last-event acker.
#[derive(Clone, Default)]
pub struct LastEventRecorder {
    seen: Arc<Mutex<Vec<Option<String>>>>,
    notify: Arc<Notify>,
}

impl LastEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler to connect a client with.
    pub fn handler(&self) -> LastEventAckHandler {
        let seen = self.seen.clone();
        let notify = self.notify.clone();
        Arc::new(move |tag| {
            seen.lock().unwrap().push(tag_string(&tag));
            notify.notify_one();
        })
    }

    /// All recorded last events, in order.
    pub fn seen(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().clone()
    }

    /// Waits until `expected` batches were reported.
    ///
    /// # Panics
    ///
    /// Panics when a callback takes longer than the wait timeout.
    pub async fn wait_for_count(&self, expected: usize) {
        let notified = TimedNotify::with_timeout(self.notify.clone(), WAIT_TIMEOUT);
        loop {
            if self.seen.lock().unwrap().len() >= expected {
                return;
            }
            notified.notified().await;
        }
    }
}
