use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use shipper_config::shared::EmptyDestination;

use crate::ack::{Acker, CloseSummary};
use crate::concurrency::gate::{Admission, EventGate};
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx};
use crate::pipeline::{ClientRegistry, PipelineCounters, PipelineId};
use crate::queue::{Queue, QueueEntry};
use crate::selector::Selector;
use crate::types::Event;

/// Identifier of a client within its pipeline.
pub type ClientId = u64;

/// Result of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The event was admitted and handed to the queue.
    Published,
    /// The event was not enqueued; the reason distinguishes local refusal
    /// from saturation and close races.
    Dropped(DropReason),
}

/// Why an event was dropped instead of published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The selector yielded no destination and the client is configured to
    /// drop in that case.
    EmptyDestination,
    /// The in-flight limit was reached and the client drops on saturation.
    Saturated,
    /// The client was closing or closed.
    ClientClosed,
    /// The queue refused the event after admission.
    QueueRejected,
}

/// A producer's handle to the pipeline, one per connection.
///
/// Clients apply the configured backpressure policy, compute each event's
/// destination, and feed admitted events to the queue. All methods take
/// `&self`; a client shared behind an [`Arc`] may be published to and
/// closed concurrently, and [`Client::close`] is idempotent.
pub struct Client<Q> {
    id: ClientId,
    pipeline_id: PipelineId,
    queue: Q,
    gate: EventGate,
    selector: Arc<Selector>,
    acker: Arc<dyn Acker>,
    counters: Arc<PipelineCounters>,
    registry: ClientRegistry,
    can_drop: bool,
    empty_destination: EmptyDestination,
    close_tx: ShutdownTx,
    close_rx: ShutdownRx,
    closed: AtomicBool,
}

impl<Q> Client<Q>
where
    Q: Queue + Clone,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ClientId,
        pipeline_id: PipelineId,
        queue: Q,
        gate: EventGate,
        selector: Arc<Selector>,
        acker: Arc<dyn Acker>,
        counters: Arc<PipelineCounters>,
        registry: ClientRegistry,
        can_drop: bool,
        empty_destination: EmptyDestination,
        close_tx: ShutdownTx,
    ) -> Self {
        let close_rx = close_tx.subscribe();

        Self {
            id,
            pipeline_id,
            queue,
            gate,
            selector,
            acker,
            counters,
            registry,
            can_drop,
            empty_destination,
            close_tx,
            close_rx,
            closed: AtomicBool::new(false),
        }
    }

    /// Identifier of this client within its pipeline.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Publishes one event.
    ///
    /// The event runs through the destination selector, then through
    /// admission: a slot on the in-flight gate (suspending or failing fast
    /// per the publish mode) and the acker guard. Only a fully admitted
    /// event reaches the queue. Suspension ends early when the client is
    /// closed, in which case the event is reported dropped rather than
    /// left hanging.
    pub async fn publish(&self, event: Event) -> PublishOutcome {
        if !self.is_open() {
            self.counters.note_dropped();
            return PublishOutcome::Dropped(DropReason::ClientClosed);
        }

        // 1. Destination routing. Selector failures are routing
        // degradation, not publish errors: they resolve to the empty
        // destination and follow the configured empty-destination policy.
        let destination = match self.selector.select(&event) {
            Ok(destination) => destination,
            Err(err) => {
                debug!(client = self.id, error = %err, "selector failed, using empty destination");
                String::new()
            }
        };

        let drops_on_empty = matches!(self.empty_destination, EmptyDestination::Drop);
        let mut will_publish = true;
        let mut drop_reason = DropReason::EmptyDestination;
        if destination.is_empty() && drops_on_empty {
            will_publish = false;
        }

        // 2. In-flight slot. Acquired before guard admission so that the
        // `published` flag passed to the acker is final.
        if will_publish {
            if self.can_drop {
                if !self.gate.try_acquire() {
                    will_publish = false;
                    drop_reason = DropReason::Saturated;
                }
            } else {
                let mut close_rx = self.close_rx.clone();
                match self.gate.acquire(&mut close_rx).await {
                    Admission::Granted => {}
                    Admission::Closed => {
                        // Woken by close before admission: nothing was
                        // tracked, so nothing can be lost.
                        self.counters.note_dropped();
                        return PublishOutcome::Dropped(DropReason::ClientClosed);
                    }
                }
            }
        }

        // 3. Guard admission: the single atomic point deciding between
        // "admitted and tracked" and "rejected and untracked".
        if !self.acker.add_event(&event, will_publish) {
            if will_publish {
                self.gate.release(1);
            }
            self.counters.note_dropped();
            return PublishOutcome::Dropped(DropReason::ClientClosed);
        }

        if !will_publish {
            self.counters.note_dropped();
            return PublishOutcome::Dropped(drop_reason);
        }

        // 4. Enqueue with the correlation token tying acks back to this
        // client's acker.
        let entry = QueueEntry {
            client: self.id,
            destination,
            event,
        };
        if !self.queue.enqueue(entry) {
            self.gate.release(1);
            self.counters.note_failed();
            warn!(client = self.id, "queue refused event");
            return PublishOutcome::Dropped(DropReason::QueueRejected);
        }

        self.counters.note_published();
        PublishOutcome::Published
    }

    /// Closes the client.
    ///
    /// Wakes any publisher blocked on the gate, flips the acker guard so no
    /// further events are admitted, then (for wait-close decorated clients)
    /// drains outstanding acks up to the grace period. Safe to call
    /// concurrently with in-flight publishes and more than once; later
    /// calls return an empty summary.
    pub async fn close(&self) -> CloseSummary {
        if self.closed.swap(true, Ordering::SeqCst) {
            return CloseSummary::default();
        }

        self.close_tx.shutdown();
        let summary = self.acker.close().await;

        // The registry entry must outlive the close while confirmations
        // for already-admitted events are still in flight; the pipeline's
        // shutdown drains whatever remains.
        if summary.unacked == 0 {
            self.registry.remove(self.id);
        }

        info!(
            pipeline = self.pipeline_id,
            client = self.id,
            unacked = summary.unacked,
            "client closed"
        );

        summary
    }
}

impl<Q> Client<Q> {
    /// Returns true while the client accepts publishes.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

impl<Q> Drop for Client<Q> {
    fn drop(&mut self) {
        // Best-effort cleanup for clients dropped without an explicit
        // close: wake blocked publishers. The registry entry stays so acks
        // for in-flight events keep landing; pipeline shutdown removes it.
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close_tx.shutdown();
        }
    }
}

impl<Q> std::fmt::Debug for Client<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("pipeline_id", &self.pipeline_id)
            .field("can_drop", &self.can_drop)
            .field("open", &self.is_open())
            .finish()
    }
}
