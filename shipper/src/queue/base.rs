use tokio::sync::mpsc;

use crate::client::ClientId;
use crate::types::Event;

/// An event handed to the queue, with its routing metadata and the
/// correlation token identifying the owning client.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Correlation token: the client (and thereby acker) this event
    /// belongs to.
    pub client: ClientId,
    /// Destination computed by the selector. Empty means "use the output's
    /// own default routing".
    pub destination: String,
    /// The event itself, immutable from here on.
    pub event: Event,
}

/// Notification that `count` events of `client` were confirmed.
///
/// Counts refer to published events only, in the order they were enqueued
/// for that client.
#[derive(Debug, Clone, Copy)]
pub struct AckNotification {
    /// The client whose events were confirmed.
    pub client: ClientId,
    /// Number of confirmed events, from the front of the client's order.
    pub count: usize,
}

/// Sender half of the ack notification channel, held by the queue.
pub type AckTx = mpsc::UnboundedSender<AckNotification>;

/// Receiver half of the ack notification channel, consumed by the
/// pipeline's dispatch task.
pub type AckRx = mpsc::UnboundedReceiver<AckNotification>;

/// Trait for queue implementations receiving events from the pipeline.
///
/// Implementations buffer events between producers and outputs. The
/// pipeline has already applied its backpressure policy when `enqueue` is
/// called, so implementations should accept without suspending; a `false`
/// return means the queue refuses the event outright (typically because it
/// is shutting down), which the pipeline counts as a local drop distinct
/// from published-then-lost.
///
/// Confirmations flow back through the channel registered with
/// [`Queue::register_ack_sender`]: per client, they must be reported in the
/// same order events were enqueued, since ack aggregation depends on
/// front-of-queue ordering.
pub trait Queue: Send + Sync + 'static {
    /// Hands an event to the queue. Returns false if the queue refuses it.
    fn enqueue(&self, entry: QueueEntry) -> bool;

    /// Registers the channel through which confirmations are reported.
    fn register_ack_sender(&self, tx: AckTx);
}
