//! Notification fan-out for the UI layer
//!
//! Notifications are broadcast; a UI that subscribes late only sees what is
//! raised after it subscribed. Every notification is also logged.

use domain::{Notification, NotificationKind};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const DEFAULT_CAPACITY: usize = 64;

/// Broadcasts [`Notification`]s to every subscriber
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish a notification; returns how many subscribers received it
    pub fn publish(&self, notification: Notification) -> usize {
        let local_id = notification.local_id.map(|id| id.to_string());
        match notification.kind {
            NotificationKind::Success => {
                info!(local_id = ?local_id, message = %notification.message, "Notification");
            },
            NotificationKind::Warning => {
                warn!(local_id = ?local_id, message = %notification.message, "Notification");
            },
            NotificationKind::Error => {
                error!(
                    local_id = ?local_id,
                    actionable = notification.actionable,
                    message = %notification.message,
                    "Notification"
                );
            },
        }
        // No subscribers is not an error
        self.sender.send(notification).unwrap_or(0)
    }
}
