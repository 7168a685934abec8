//! Fire-and-forget status notifications.

use courier_core::message::Notification;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast publisher for [`Notification`]s. Having no subscribers is fine.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn emit(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("notification dropped: no subscribers");
        }
    }
}
