use tokio::sync::broadcast;
use super::events::AppEvent;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Single outbound channel for history notifications
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register a listener. Receivers that fall behind observe `Lagged`
    /// and should re-read the history.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit an application event to every listener
pub fn emit_event(bus: &EventBus, event: AppEvent) {
    let name = event.name();
    if bus.sender.send(event).is_err() {
        tracing::trace!(event = name, "no listeners for event");
    }
}
