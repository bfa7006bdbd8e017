//! Acknowledgment aggregation for publisher clients.
//!
//! Ack signals arrive from the queue side as bare counts ("the n oldest
//! published events of this client were confirmed"), out of band from any
//! publish call. The ackers in this module turn those counts into the
//! producer-facing callbacks a client asked for when connecting:
//!
//! - [`CountAcker`] reports `(acked, dropped)` totals per batch.
//! - [`EventAcker`] hands back the opaque per-event correlation data in
//!   admission order; [`last_event_handler`] coalesces that to the last
//!   element of each batch.
//! - [`PipelineAcker`] keeps only a pending count, for producers that want
//!   no ack detail.
//! - [`WaitCloseAcker`] decorates any of the above so `close` blocks until
//!   outstanding events drain or a grace period elapses.
//! - [`ClientAcker`] is the atomically-gated guard that lets a client
//!   detach from an active acker without losing or double-counting
//!   in-flight events.
//!
//! All ackers are composed behind the object-safe [`Acker`] trait; the
//! wait-close decorator wraps the guard, which wraps the concrete variant.

mod count;
mod event;
mod guard;
mod pipeline;
mod wait;

pub use count::CountAcker;
pub use event::{EventAcker, last_event_handler};
pub use guard::ClientAcker;
pub use pipeline::PipelineAcker;
pub use wait::WaitCloseAcker;

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{AckTag, Event};

/// Callback receiving `(acked, dropped)` totals per confirmed batch.
pub type CountAckHandler = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Callback receiving the correlation data of each confirmed event, in
/// admission order. Entries without attached data arrive as [`None`].
pub type EventsAckHandler = Arc<dyn Fn(Vec<Option<AckTag>>) + Send + Sync>;

/// Callback receiving only the last confirmed event of each batch.
pub type LastEventAckHandler = Arc<dyn Fn(Option<AckTag>) + Send + Sync>;

/// Ack reporting requested by a producer when connecting.
#[derive(Clone, Default)]
pub enum AckMode {
    /// No ack detail; only pipeline-wide counters move.
    #[default]
    None,
    /// Per-batch `(acked, dropped)` counts.
    Count(CountAckHandler),
    /// Per-event correlation data in admission order.
    Events(EventsAckHandler),
    /// Only the last event of each confirmed batch.
    LastEvent(LastEventAckHandler),
}

impl std::fmt::Debug for AckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Count(_) => "Count",
            Self::Events(_) => "Events",
            Self::LastEvent(_) => "LastEvent",
        };
        f.write_str(name)
    }
}

/// Result of closing an acker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseSummary {
    /// Events admitted for publishing that were never confirmed.
    ///
    /// Non-zero only when close gave up before all acks arrived; those
    /// events are reported lost, not retried.
    pub unacked: usize,
}

/// Aggregates ack signals for one client.
///
/// `add_event` is called on the publish path with the final publish
/// decision; `ack_events` is called from the pipeline's dispatch task, in
/// admission order per client; `close` detaches the producer.
///
/// Ack counts refer to published events only: events admitted with
/// `published = false` never reach the queue and are accounted for by the
/// acker itself.
#[async_trait]
pub trait Acker: Send + Sync {
    /// Records an event entering ack bookkeeping.
    ///
    /// Returns false when the acker no longer admits events (client
    /// closing or closed); a rejected event must not be enqueued.
    fn add_event(&self, event: &Event, published: bool) -> bool;

    /// Confirms the `n` oldest still-pending published events.
    fn ack_events(&self, n: usize);

    /// Detaches the producer, reporting events never confirmed.
    async fn close(&self) -> CloseSummary;
}
