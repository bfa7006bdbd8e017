//! The process-wide publisher pipeline.
//!
//! A [`Pipeline`] owns the in-flight gate, the pipeline-wide counters, and
//! the registry tying correlation tokens back to client ackers. It
//! constructs [`Client`]s on [`Pipeline::connect`] and runs a single
//! dispatch task that consumes the queue's ack notifications, releases
//! gate slots, and forwards confirmations to the owning client's acker —
//! one task per pipeline, so per-client FIFO ordering holds by
//! construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shipper_config::shared::{ClientSettings, PipelineSettings, PublishMode};

use crate::ack::{
    Acker, AckMode, ClientAcker, CountAcker, EventAcker, PipelineAcker, WaitCloseAcker,
    last_event_handler,
};
use crate::bail;
use crate::client::{Client, ClientId};
use crate::concurrency::gate::EventGate;
use crate::concurrency::shutdown::{
    ShutdownRx, ShutdownTx, create_shutdown_channel, wait_for_shutdown,
};
use crate::error::{ErrorKind, ShipperResult};
use crate::queue::{AckNotification, AckRx, Queue};
use crate::selector::Selector;
use crate::shipper_error;

pub type PipelineId = u64;

/// Per-connection configuration: declarative settings plus the runtime ack
/// callbacks.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Declarative knobs (publish mode, wait-close grace, empty-destination
    /// policy).
    pub settings: ClientSettings,
    /// Ack reporting requested by the producer.
    pub ack_mode: AckMode,
}

/// Process-wide event statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events handed to the queue.
    pub published: u64,
    /// Events dropped before reaching the queue.
    pub dropped: u64,
    /// Events refused by the queue after admission.
    pub failed: u64,
    /// Events confirmed by the queue or outputs.
    pub acked: u64,
    /// Events currently in flight.
    pub in_flight: usize,
}

/// Atomic counter set backing [`PipelineStats`].
#[derive(Debug, Default)]
pub struct PipelineCounters {
    published: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    acked: AtomicU64,
}

impl PipelineCounters {
    pub(crate) fn note_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_acked(&self, n: usize) {
        self.acked.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Registry entry for one connected client.
#[derive(Clone)]
pub(crate) struct ClientHandle {
    acker: Arc<dyn Acker>,
    close_tx: ShutdownTx,
}

/// Maps correlation tokens to client ackers.
///
/// Entries outlive [`Client::close`] while confirmations are still in
/// flight: the guard keeps forwarding acks for events admitted before the
/// close, and removing the entry early would lose those counts. A client
/// removes itself once nothing is outstanding; pipeline shutdown drains
/// the rest.
#[derive(Clone, Default)]
pub(crate) struct ClientRegistry {
    clients: Arc<RwLock<HashMap<ClientId, ClientHandle>>>,
}

impl ClientRegistry {
    fn insert(&self, id: ClientId, handle: ClientHandle) {
        self.clients.write().unwrap().insert(id, handle);
    }

    pub(crate) fn remove(&self, id: ClientId) {
        self.clients.write().unwrap().remove(&id);
    }

    fn acker(&self, id: ClientId) -> Option<Arc<dyn Acker>> {
        self.clients
            .read()
            .unwrap()
            .get(&id)
            .map(|handle| handle.acker.clone())
    }

    fn drain(&self) -> Vec<(ClientId, ClientHandle)> {
        self.clients.write().unwrap().drain().collect()
    }
}

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started { dispatch: JoinHandle<()> },
}

/// The process-wide owner of the queue handle, the in-flight gate, and the
/// acker registry.
pub struct Pipeline<Q> {
    id: PipelineId,
    settings: Arc<PipelineSettings>,
    queue: Q,
    gate: EventGate,
    selector: Arc<Selector>,
    counters: Arc<PipelineCounters>,
    clients: ClientRegistry,
    next_client_id: AtomicU64,
    shutdown_tx: ShutdownTx,
    state: PipelineState,
}

impl<Q> Pipeline<Q>
where
    Q: Queue + Clone,
{
    /// Creates a pipeline over the given queue with the given destination
    /// selector.
    ///
    /// Configuration is validated here: construction-time errors surface to
    /// the caller and are never silently defaulted.
    pub fn new(settings: PipelineSettings, selector: Selector, queue: Q) -> ShipperResult<Self> {
        settings.validate()?;

        // We create a watch channel of unit meaning: it only notifies all
        // subscribers that shutdown is needed. Receivers are derived from
        // the transmitter via `subscribe` where needed.
        let (shutdown_tx, _) = create_shutdown_channel();

        let gate = EventGate::new(settings.max_in_flight);

        Ok(Self {
            id: settings.id,
            settings: Arc::new(settings),
            queue,
            gate,
            selector: Arc::new(selector),
            counters: Arc::new(PipelineCounters::default()),
            clients: ClientRegistry::default(),
            next_client_id: AtomicU64::new(0),
            shutdown_tx,
            state: PipelineState::NotStarted,
        })
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Starts the pipeline.
    ///
    /// Registers the ack channel with the queue and spawns the dispatch
    /// task translating queue confirmations into acker calls and gate
    /// releases.
    pub async fn start(&mut self) -> ShipperResult<()> {
        if let PipelineState::Started { .. } = self.state {
            bail!(ErrorKind::InvalidState, "Pipeline was already started");
        }

        info!(
            pipeline = self.id,
            max_in_flight = self.settings.max_in_flight,
            "starting pipeline"
        );

        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        self.queue.register_ack_sender(ack_tx);

        let dispatch = tokio::spawn(dispatch_acks(
            ack_rx,
            self.clients.clone(),
            self.gate.clone(),
            self.counters.clone(),
            self.shutdown_tx.subscribe(),
        ));

        self.state = PipelineState::Started { dispatch };

        Ok(())
    }

    /// Connects a new producer, returning its [`Client`].
    ///
    /// The client's acker chain is assembled here: the concrete variant
    /// chosen by the ack mode, wrapped by the close guard, decorated with
    /// the wait-close acker when a grace period is configured.
    pub fn connect(&self, config: ClientConfig) -> ShipperResult<Client<Q>> {
        let PipelineState::Started { .. } = &self.state else {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline must be started before connecting clients"
            );
        };

        if self.shutdown_tx.is_shutdown() {
            bail!(ErrorKind::PipelineClosed, "Pipeline is shutting down");
        }

        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed) + 1;
        let wait_close = Duration::from_millis(config.settings.wait_close_ms);
        let acker = build_acker(config.ack_mode, wait_close);
        let (close_tx, _) = create_shutdown_channel();

        self.clients.insert(
            id,
            ClientHandle {
                acker: acker.clone(),
                close_tx: close_tx.clone(),
            },
        );

        debug!(pipeline = self.id, client = id, "client connected");

        Ok(Client::new(
            id,
            self.id,
            self.queue.clone(),
            self.gate.clone(),
            self.selector.clone(),
            acker,
            self.counters.clone(),
            self.clients.clone(),
            config.settings.publish_mode == PublishMode::DropIfFull,
            config.settings.empty_destination,
            close_tx,
        ))
    }

    /// Returns a snapshot of the pipeline-wide event statistics.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            published: self.counters.published.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            acked: self.counters.acked.load(Ordering::Relaxed),
            in_flight: self.gate.in_flight(),
        }
    }

    /// Shuts the pipeline down and waits for the dispatch task to stop.
    ///
    /// Remaining clients are closed first, honoring their wait-close grace
    /// periods while confirmations still flow; only then is the dispatch
    /// task stopped, draining any confirmations already reported by the
    /// queue.
    pub async fn shutdown_and_wait(self) -> ShipperResult<()> {
        let PipelineState::Started { dispatch } = self.state else {
            info!("pipeline was not started, nothing to shut down");

            return Ok(());
        };

        info!(pipeline = self.id, "shutting down pipeline");

        // We close the remaining clients before stopping ack dispatch, so
        // wait-close decorated clients can still drain.
        let mut unacked = 0;
        for (id, handle) in self.clients.drain() {
            handle.close_tx.shutdown();
            let summary = handle.acker.close().await;
            if summary.unacked > 0 {
                warn!(
                    client = id,
                    unacked = summary.unacked,
                    "client closed with unacknowledged events"
                );
                unacked += summary.unacked;
            }
        }

        self.shutdown_tx.shutdown();
        dispatch.await.map_err(|err| {
            shipper_error!(
                ErrorKind::InvalidState,
                "Ack dispatch task failed",
                err.to_string()
            )
        })?;

        info!(pipeline = self.id, unacked, "pipeline shut down");

        Ok(())
    }
}

impl<Q> std::fmt::Debug for Pipeline<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("in_flight", &self.gate.in_flight())
            .finish()
    }
}

/// Assembles the acker chain for one client.
fn build_acker(mode: AckMode, wait_close: Duration) -> Arc<dyn Acker> {
    let concrete: Box<dyn Acker> = match mode {
        AckMode::Count(handler) => Box::new(CountAcker::new(handler)),
        AckMode::Events(handler) => Box::new(EventAcker::new(handler)),
        AckMode::LastEvent(handler) => Box::new(EventAcker::new(last_event_handler(handler))),
        AckMode::None => Box::new(PipelineAcker::new()),
    };

    let guard = ClientAcker::lift(concrete);
    if wait_close.is_zero() {
        Arc::new(guard)
    } else {
        Arc::new(WaitCloseAcker::new(Box::new(guard), wait_close))
    }
}

/// Translates queue confirmations into acker calls and gate releases.
///
/// Runs until the pipeline shuts down or the queue drops its ack sender.
/// On shutdown, confirmations already reported by the queue are drained so
/// no count is lost between the queue and the ackers.
async fn dispatch_acks(
    mut ack_rx: AckRx,
    clients: ClientRegistry,
    gate: EventGate,
    counters: Arc<PipelineCounters>,
    mut shutdown_rx: ShutdownRx,
) {
    loop {
        tokio::select! {
            notification = ack_rx.recv() => match notification {
                Some(notification) => {
                    handle_ack(notification, &clients, &gate, &counters);
                }
                None => {
                    debug!("ack channel closed, dispatch stopping");
                    break;
                }
            },
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                while let Ok(notification) = ack_rx.try_recv() {
                    handle_ack(notification, &clients, &gate, &counters);
                }
                debug!("dispatch stopping after shutdown");
                break;
            }
        }
    }
}

fn handle_ack(
    notification: AckNotification,
    clients: &ClientRegistry,
    gate: &EventGate,
    counters: &PipelineCounters,
) {
    // Slots free up per notification regardless of which acker consumes
    // it, keeping the gate invariant independent of client lifecycles.
    gate.release(notification.count);
    counters.note_acked(notification.count);

    match clients.acker(notification.client) {
        Some(acker) => acker.ack_events(notification.count),
        None => debug!(
            client = notification.client,
            count = notification.count,
            "confirmation for unknown client"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::MemoryQueue;

    fn settings(id: PipelineId) -> PipelineSettings {
        PipelineSettings {
            id,
            max_in_flight: 16,
        }
    }

    #[tokio::test]
    async fn connect_requires_started_pipeline() {
        let pipeline =
            Pipeline::new(settings(1), Selector::make(vec![]), MemoryQueue::new()).unwrap();

        let err = pipeline.connect(ClientConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn start_is_not_repeatable() {
        let mut pipeline =
            Pipeline::new(settings(2), Selector::make(vec![]), MemoryQueue::new()).unwrap();

        pipeline.start().await.unwrap();
        let err = pipeline.start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        pipeline.shutdown_and_wait().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_invalid_settings() {
        let invalid = PipelineSettings {
            id: 3,
            max_in_flight: 0,
        };

        let err = Pipeline::new(invalid, Selector::make(vec![]), MemoryQueue::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[tokio::test]
    async fn shutdown_without_start_is_a_noop() {
        let pipeline =
            Pipeline::new(settings(4), Selector::make(vec![]), MemoryQueue::new()).unwrap();

        pipeline.shutdown_and_wait().await.unwrap();
    }
}
