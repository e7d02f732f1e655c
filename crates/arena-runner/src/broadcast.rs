//! Fan-out of arena events to live subscribers.
//!
//! Each event is serialized once and the shared JSON payload is handed to
//! every subscriber in turn. Delivery is at-most-once: a subscriber whose
//! delivery fails is dropped from the set and never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::event::ArenaEvent;

/// Identifies an attached subscriber.
pub type SubscriberId = u64;

/// Receives serialized events.
///
/// `deliver` is called with the broadcaster's lock held, so it must not block.
pub trait EventSink: Send + Sync {
    fn deliver(&self, payload: Arc<str>) -> anyhow::Result<()>;
}

/// Sink feeding an unbounded channel; fails once the receiver is gone.
struct ChannelSink {
    tx: mpsc::UnboundedSender<Arc<str>>,
}

impl EventSink for ChannelSink {
    fn deliver(&self, payload: Arc<str>) -> anyhow::Result<()> {
        self.tx
            .send(payload)
            .map_err(|_| anyhow::anyhow!("subscription receiver dropped"))
    }
}

/// Receiving end of [`Broadcaster::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<Arc<str>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next raw JSON payload; `None` once the broadcaster is shut down.
    pub async fn recv_raw(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Next decoded event; `None` once the broadcaster is shut down.
    pub async fn recv(&mut self) -> Option<ArenaEvent> {
        loop {
            let payload = self.rx.recv().await?;
            match serde_json::from_str(&payload) {
                Ok(event) => return Some(event),
                Err(e) => warn!(subscriber = self.id, error = %e, "undecodable event payload"),
            }
        }
    }

    /// Next already-queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<ArenaEvent> {
        while let Ok(payload) = self.rx.try_recv() {
            if let Ok(event) = serde_json::from_str(&payload) {
                return Some(event);
            }
        }
        None
    }
}

#[derive(Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<(SubscriberId, Box<dyn EventSink>)>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel-backed subscription.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.attach(ChannelSink { tx });
        Subscription { id, rx }
    }

    /// Attach a custom sink.
    pub fn attach(&self, sink: impl EventSink + 'static) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().push((id, Box::new(sink)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Serialize `event` once and deliver it to every subscriber.
    ///
    /// Returns how many subscribers received it.
    pub fn broadcast(&self, event: &ArenaEvent) -> usize {
        let payload: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(kind = event.kind(), error = %e, "failed to serialize event");
                return 0;
            }
        };

        let mut subscribers = self.lock();
        subscribers.retain(|(id, sink)| match sink.deliver(Arc::clone(&payload)) {
            Ok(()) => true,
            Err(e) => {
                warn!(subscriber = *id, kind = event.kind(), error = %e, "dropping subscriber");
                false
            }
        });
        subscribers.len()
    }

    /// Detach everyone; open subscriptions see end-of-stream.
    pub fn close(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriberId, Box<dyn EventSink>)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod broadcast_tests;
