use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::ack::{Acker, CloseSummary};
use crate::types::Event;

/// Counter-only acker for producers that want no ack detail.
///
/// Keeps the admission path free of locks and allocations: only a pending
/// count moves, so close can still report how many events were never
/// confirmed. Pipeline-wide statistics are maintained by the pipeline
/// itself, not here.
#[derive(Default)]
pub struct PipelineAcker {
    pending: AtomicUsize,
}

impl PipelineAcker {
    /// Creates a counter-only acker.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Acker for PipelineAcker {
    fn add_event(&self, _event: &Event, published: bool) -> bool {
        if published {
            self.pending.fetch_add(1, Ordering::AcqRel);
        }
        true
    }

    fn ack_events(&self, n: usize) {
        let mut current = self.pending.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(n);
            match self.pending.compare_exchange(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    async fn close(&self) -> CloseSummary {
        CloseSummary {
            unacked: self.pending.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn tracks_pending_published_events_only() {
        let acker = PipelineAcker::new();
        let event = Event::new(Utc::now());

        assert!(acker.add_event(&event, true));
        assert!(acker.add_event(&event, false));
        assert!(acker.add_event(&event, true));

        acker.ack_events(1);
        assert_eq!(acker.close().await.unacked, 1);
    }

    #[tokio::test]
    async fn excess_acks_saturate_at_zero() {
        let acker = PipelineAcker::new();
        let event = Event::new(Utc::now());

        assert!(acker.add_event(&event, true));
        acker.ack_events(5);

        assert_eq!(acker.close().await.unacked, 0);
    }
}
