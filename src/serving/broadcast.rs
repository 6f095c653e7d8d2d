//! # Status Broadcaster
//!
//! In-process pub/sub for status events on the fixed `serving_status` topic.
//!
//! A thin wrapper around `tokio::sync::broadcast` so the manager can publish
//! from its control loop without ever blocking on a subscriber:
//! - **Non-blocking publish**: `publish()` returns immediately; with no
//!   subscribers the event is simply dropped
//! - **Bounded capacity**: a ring buffer keeps the most recent events; slow
//!   subscribers observe `RecvError::Lagged` and skip what they missed
//! - **No persistence**: subscribers only see events sent after they
//!   subscribed

use tokio::sync::broadcast;

use crate::serving::status::StatusEvent;

/// Broadcast channel for serving status events.
///
/// Cheap to clone; publish failures (no active subscribers) are no-ops and
/// never surface back into the state transition that triggered them.
#[derive(Debug, Clone)]
pub struct StatusBroadcaster {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusBroadcaster {
    /// Create a broadcaster with the given ring-buffer capacity (clamped to
    /// at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: StatusEvent) {
        // Err here only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    /// Create a new independent subscriber for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serving::status::ServingStatus;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = StatusBroadcaster::new(8);
        let mut rx = bus.subscribe();

        bus.publish(StatusEvent::now(ServingStatus::Idle));

        let event = rx.recv().await.expect("event delivered");
        assert!(event.status.is_idle());
    }

    /// Publishing with no subscribers must not fail or block.
    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = StatusBroadcaster::new(8);
        bus.publish(StatusEvent::now(ServingStatus::Idle));

        // A subscriber created afterwards sees only later events.
        let mut rx = bus.subscribe();
        bus.publish(StatusEvent::now(ServingStatus::Error {
            model: "m".to_string(),
            reason: "boom".to_string(),
        }));
        let event = rx.recv().await.expect("event delivered");
        assert!(matches!(event.status, ServingStatus::Error { .. }));
    }
}
