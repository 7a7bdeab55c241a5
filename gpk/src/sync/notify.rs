//! Change notification between the sync engine and its consumers

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Single-slot change signal
///
/// Holds a generation counter bumped once per cycle that installed something.
/// Receivers see only the latest generation, never a queue of events, and
/// either await [`watch::Receiver::changed`] or poll
/// [`watch::Receiver::has_changed`] from their own thread.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: Arc<watch::Sender<u64>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Bump the generation and wake subscribers
    pub fn notify(&self) -> u64 {
        self.tx.send_modify(|generation| *generation += 1);
        let generation = *self.tx.borrow();
        debug!(%generation, "ChangeNotifier::notify: bumped");
        generation
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
