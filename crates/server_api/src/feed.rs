use std::sync::Arc;

use shared::protocol::ServerEvent;
use tokio::sync::{broadcast, Mutex, MutexGuard};

/// Fan-out hub for order events.
///
/// Mutations publish while holding the gate returned by [`OrderFeed::lock`],
/// so every subscriber sees broadcasts in the order the store applied them.
#[derive(Clone)]
pub struct OrderFeed {
    events: broadcast::Sender<ServerEvent>,
    gate: Arc<Mutex<()>>,
}

impl OrderFeed {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            events,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn lock(&self) -> PublishGuard<'_> {
        PublishGuard {
            _gate: self.gate.lock().await,
            events: &self.events,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

pub struct PublishGuard<'a> {
    _gate: MutexGuard<'a, ()>,
    events: &'a broadcast::Sender<ServerEvent>,
}

impl PublishGuard<'_> {
    /// Returns how many subscribers the event was queued for.
    pub fn publish(&self, event: ServerEvent) -> usize {
        // No subscribers is not an error: nobody is connected yet.
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }
}
