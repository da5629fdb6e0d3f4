//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use turnip_domain::event::Event;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). Cloning yields another handle to the
/// same channel.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: Event) {
        // broadcast::send fails only when there are zero receivers.
        let _ = self.sender.send(event);
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnip_domain::event::Lifecycle;
    use turnip_domain::output_state::OutputState;
    use turnip_domain::time::now;

    fn output_changed(state: OutputState) -> Event {
        Event::OutputChanged {
            output: "fan".to_string(),
            state,
            at: now(),
        }
    }

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        let event = output_changed(OutputState::On);
        bus.publish(event.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.clone().subscribe();

        let event = Event::LifecycleChanged {
            state: Lifecycle::Running,
            at: now(),
        };
        bus.publish(event.clone());

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(output_changed(OutputState::On));

        let mut rx = bus.subscribe();
        let later = output_changed(OutputState::Off);
        bus.publish(later.clone());

        assert_eq!(rx.recv().await.unwrap(), later);
    }

    #[test]
    fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::default();
        bus.publish(output_changed(OutputState::On));
    }
}
