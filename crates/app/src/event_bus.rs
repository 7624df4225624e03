//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use domohub_domain::error::HubError;
use domohub_domain::event::DeviceEvent;

use crate::ports::EventPublisher;

/// Fans device updates out to every connected observer.
///
/// Publishing never fails and never waits: without observers the update is
/// dropped, and an observer more than `capacity` updates behind loses the
/// oldest ones.
pub struct InProcessEventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every update published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: DeviceEvent) -> impl Future<Output = Result<(), HubError>> + Send {
        if let Err(err) = self.sender.send(event) {
            tracing::trace!(role = %err.0.role, "no observer connected");
        }
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{lamp, thermometer};
    use domohub_domain::device::Role;

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DeviceEvent::single(lamp("LAMP1"))).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.role, Role::Output);
        assert_eq!(received.devices[0].id.as_str(), "LAMP1");
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DeviceEvent::single(thermometer("TEMP1", "S1")))
            .await
            .unwrap();

        let r1 = rx1.recv().await.unwrap();
        let r2 = rx2.recv().await.unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1.channel(), "inputDeviceUpdate");
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        let result = bus.publish(DeviceEvent::single(lamp("LAMP1"))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_drop_oldest_updates_for_lagging_observer() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();

        for id in ["LAMP1", "LAMP2", "LAMP3"] {
            bus.publish(DeviceEvent::single(lamp(id))).await.unwrap();
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.devices[0].id.as_str(), "LAMP2");
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(DeviceEvent::single(lamp("EARLY"))).await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(DeviceEvent::single(lamp("LATE"))).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.devices[0].id.as_str(), "LATE");
    }
}
