//! Session lifecycle notifications.
//!
//! Navigation layers subscribe here instead of checking every call site for a
//! 401: the manager emits `AuthorizationLost` once, after local cleanup.

use std::collections::BTreeSet;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn {
        subject: Option<String>,
        roles: BTreeSet<String>,
    },
    LoggedOut,
    /// A stored or freshly issued token failed to decode and was discarded.
    Invalidated { reason: String },
    /// The API rejected the token with 401/403; the store is already cleared.
    AuthorizationLost { status: u16 },
}

#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        if let Err(err) = self.sender.send(event) {
            trace!("session event dropped: {:?}", err.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(SessionEvent::LoggedOut);
        bus.emit(SessionEvent::AuthorizationLost { status: 403 });

        assert_eq!(rx.recv().await.ok(), Some(SessionEvent::LoggedOut));
        assert_eq!(
            rx.recv().await.ok(),
            Some(SessionEvent::AuthorizationLost { status: 403 })
        );
    }

    #[test]
    fn emit_without_subscribers_does_not_fail() {
        let bus = EventBus::new();
        bus.emit(SessionEvent::LoggedOut);
    }
}
