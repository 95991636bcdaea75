use tokio::sync::broadcast;

use crate::dto::notification::Notification;

/// Outbound side of the transport boundary. Fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Deliver a notification to whoever watches its session.
    fn notify(&self, notification: Notification);
}

/// Broadcast hub fanning notifications out to SSE subscribers and adapters.
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl NotificationHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Notifier for NotificationHub {
    fn notify(&self, notification: Notification) {
        // No subscribers is not an error.
        let _ = self.sender.send(notification);
    }
}
