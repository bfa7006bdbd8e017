use tokio::sync::watch;

/// Transmitter side of a one-way shutdown signal.
///
/// [`ShutdownTx`] wraps a watch channel used to notify all subscribers that
/// shutdown (or client close) has been requested. The signal carries no
/// payload and fires at most once; receivers created after the signal still
/// observe it.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Signals shutdown to all current and future subscribers.
    ///
    /// Repeated calls are harmless; the transition is one-way.
    pub fn shutdown(&self) {
        // Infallible send so signaling works even before any receiver
        // subscribes.
        self.0.send_replace(true);
    }

    /// Returns true if shutdown has already been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Creates a new receiver subscription.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of the shutdown signal.
pub type ShutdownRx = watch::Receiver<bool>;

/// Creates a new shutdown signal channel.
///
/// The channel starts in the "running" state; [`ShutdownTx::shutdown`]
/// flips it permanently.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), rx)
}

/// Suspends until the given receiver observes the shutdown signal.
///
/// Resolves immediately if shutdown was signaled before the call. A dropped
/// transmitter counts as shutdown, since no signal can arrive anymore.
pub async fn wait_for_shutdown(rx: &mut ShutdownRx) {
    // wait_for resolves immediately when the current value already matches,
    // covering subscribers that arrive after the signal fired.
    let _ = rx.wait_for(|shutdown| *shutdown).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_reaches_existing_and_late_subscribers() {
        let (tx, mut early) = create_shutdown_channel();

        tx.shutdown();
        wait_for_shutdown(&mut early).await;

        let mut late = tx.subscribe();
        wait_for_shutdown(&mut late).await;

        assert!(tx.is_shutdown());
    }

    #[tokio::test]
    async fn dropped_transmitter_counts_as_shutdown() {
        let (tx, mut rx) = create_shutdown_channel();
        drop(tx);

        wait_for_shutdown(&mut rx).await;
    }
}
