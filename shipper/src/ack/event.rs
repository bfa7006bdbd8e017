use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ack::{Acker, CloseSummary, EventsAckHandler, LastEventAckHandler};
use crate::types::{AckTag, Event};

/// Retains per-event correlation data in publish order and hands it back as
/// acks arrive.
///
/// Consumption order mirrors [`crate::ack::CountAcker`]: an ack of `n`
/// yields the `n` oldest still-retained published entries, carrying along
/// any dropped entries consumed on the way, all in admission order. The
/// retained data is discarded once reported.
pub struct EventAcker {
    handler: EventsAckHandler,
    state: Mutex<EventState>,
}

#[derive(Default)]
struct EventState {
    /// Admission-ordered correlation data with its `published` flag.
    entries: VecDeque<(Option<AckTag>, bool)>,
    /// Number of published entries, for the immediate-drop decision.
    published_pending: usize,
}

impl EventAcker {
    /// Creates an event acker invoking `handler` per confirmed batch.
    pub fn new(handler: EventsAckHandler) -> Self {
        Self {
            handler,
            state: Mutex::new(EventState::default()),
        }
    }
}

#[async_trait]
impl Acker for EventAcker {
    fn add_event(&self, event: &Event, published: bool) -> bool {
        let immediate = {
            let mut state = self.state.lock().unwrap();
            if !published && state.published_pending == 0 {
                Some(event.private.clone())
            } else {
                state.entries.push_back((event.private.clone(), published));
                if published {
                    state.published_pending += 1;
                }
                None
            }
        };

        if let Some(tag) = immediate {
            (self.handler)(vec![tag]);
        }

        true
    }

    fn ack_events(&self, n: usize) {
        let batch = {
            let mut state = self.state.lock().unwrap();

            let mut batch = Vec::new();
            let mut acked = 0;
            while acked < n {
                match state.entries.pop_front() {
                    Some((tag, published)) => {
                        if published {
                            acked += 1;
                            state.published_pending -= 1;
                        }
                        batch.push(tag);
                    }
                    None => break,
                }
            }

            while matches!(state.entries.front(), Some((_, false))) {
                let (tag, _) = state.entries.pop_front().expect("front just checked");
                batch.push(tag);
            }

            batch
        };

        if !batch.is_empty() {
            (self.handler)(batch);
        }
    }

    async fn close(&self) -> CloseSummary {
        let state = self.state.lock().unwrap();
        CloseSummary {
            unacked: state.entries.len(),
        }
    }
}

/// Adapts a last-event callback to the batch shape of [`EventAcker`].
///
/// The returned handler invokes the wrapped callback once per confirmed
/// batch, with only the batch's last element, coalescing bulk confirmations
/// into a single progress notification.
pub fn last_event_handler(handler: LastEventAckHandler) -> EventsAckHandler {
    std::sync::Arc::new(move |batch: Vec<Option<AckTag>>| {
        if let Some(last) = batch.into_iter().next_back() {
            handler(last);
        }
    })
}
