use tokio::sync::broadcast;
use tracing::debug;

/// Cross-surface notifications.
///
/// Payloads are advisory: subscribers re-pull the stores rather than
/// trusting the event body, so a lagged or dropped event can never leave a
/// surface rendering stale identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    SessionStarted { estimate_id: String },
    SessionStopped { estimate_id: String },
    /// Generic "re-pull current state" signal (reconciliation found a
    /// change, or a conflict needs adopting).
    SessionsRefreshed,
    /// Fatal for the current view; stores have been discarded.
    AuthExpired,
}

/// Typed publish/subscribe channel shared by the controller, the
/// reconciler and every render surface.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tx.subscribe()
    }

    /// Publish to whoever is listening. No subscribers is not an error.
    pub fn emit(&self, event: TrackerEvent) {
        debug!("event: {event:?}");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.emit(TrackerEvent::SessionsRefreshed);
    }

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(TrackerEvent::SessionStarted {
            estimate_id: "TE-1".to_string(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            TrackerEvent::SessionStarted {
                estimate_id: "TE-1".to_string(),
            }
        );
    }
}
