use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::warn;

use crate::concurrency::shutdown::ShutdownRx;

/// Outcome of a blocking [`EventGate::acquire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was acquired; the caller owns it until it releases.
    Granted,
    /// The close signal fired before a slot became available.
    Closed,
}

/// Bounded in-flight admission gate.
///
/// [`EventGate`] caps how many events may be admitted but not yet
/// acknowledged across the whole pipeline. Slots are acquired one at a time
/// on the publish path and released in batches as ack notifications arrive.
///
/// The invariant `0 <= in_flight() <= capacity()` holds at every
/// observation point: acquisition only succeeds while slots remain, and
/// releases are clamped against the number of outstanding slots.
#[derive(Debug, Clone)]
pub struct EventGate {
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    semaphore: Arc<Semaphore>,
}

impl EventGate {
    /// Creates a gate admitting at most `capacity` in-flight events.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Attempts to acquire one slot without suspending.
    ///
    /// Returns false when the gate is saturated; used by clients configured
    /// to drop on saturation.
    pub fn try_acquire(&self) -> bool {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                // The slot is returned through `release` once the event is
                // acknowledged, not when the permit guard drops.
                permit.forget();
                self.in_flight.fetch_add(1, Ordering::AcqRel);
                true
            }
            Err(_) => false,
        }
    }

    /// Acquires one slot, suspending until capacity is available or the
    /// close signal fires, whichever happens first.
    ///
    /// A dropped close transmitter counts as closed, so a suspended caller
    /// can never outlive the client that admitted it.
    pub async fn acquire(&self, close_rx: &mut ShutdownRx) -> Admission {
        tokio::select! {
            permit = self.semaphore.acquire() => match permit {
                Ok(permit) => {
                    permit.forget();
                    self.in_flight.fetch_add(1, Ordering::AcqRel);
                    Admission::Granted
                }
                // The semaphore is never explicitly closed; treat it the
                // same as the close signal rather than panicking.
                Err(_) => Admission::Closed,
            },
            _ = close_rx.wait_for(|closed| *closed) => Admission::Closed,
        }
    }

    /// Releases `n` slots back to the gate.
    ///
    /// Callers only release slots they acquired, so `n` exceeding the
    /// outstanding count indicates a protocol violation upstream; the
    /// release is clamped to keep the gate invariant intact.
    pub fn release(&self, n: usize) {
        let mut remaining = n;
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            let releasable = remaining.min(current);
            match self.in_flight.compare_exchange(
                current,
                current - releasable,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if releasable < remaining {
                        warn!(
                            requested = remaining,
                            released = releasable,
                            "gate release exceeded outstanding slots"
                        );
                    }
                    remaining = releasable;
                    break;
                }
                Err(observed) => current = observed,
            }
        }

        if remaining > 0 {
            self.semaphore.add_permits(remaining);
        }
    }

    /// Number of currently outstanding slots.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
