//! Event bus with explicit, strongly typed subscribers.
//!
//! Session engines publish; any number of collaborators subscribe.
//! Subscribers whose receiver has been dropped are pruned on the next
//! publish, so a closed UI tab cannot wedge the bus.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::domain::SessionEvent;

/// Fan-out bus for `SessionEvent`s. Cheap to clone; clones share the
/// subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("Event bus lock poisoned")
            .push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn publish(&self, event: SessionEvent) {
        let mut subs = self.subscribers.lock().expect("Event bus lock poisoned");
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloseReason, SessionId};

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let id = SessionId::new_v4();
        bus.publish(SessionEvent::Closed {
            id,
            reason: CloseReason::Requested,
        });

        match rx.recv().await {
            Some(SessionEvent::Closed { id: got, reason }) => {
                assert_eq!(got, id);
                assert_eq!(reason, CloseReason::Requested);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);

        bus.publish(SessionEvent::Closed {
            id: SessionId::new_v4(),
            reason: CloseReason::ChannelFault,
        });
        assert_eq!(bus.subscribers.lock().unwrap().len(), 0);
    }
}
