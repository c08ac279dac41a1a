use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{NotificationSender, StorageError};

/// Writes notifications to the log instead of a push hub
pub struct LogNotifier {
    hub: String,
}

impl LogNotifier {
    pub fn new(hub: &str) -> Self {
        Self { hub: hub.to_string() }
    }
}

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send_to_all(&self, message: &str) -> Result<(), StorageError> {
        tracing::info!(hub = %self.hub, "Broadcast notification: {}", message);
        Ok(())
    }

    async fn send_to_group(&self, group: &str, message: &str) -> Result<(), StorageError> {
        tracing::info!(hub = %self.hub, group = %group, "Group notification: {}", message);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// None for broadcasts
    pub group: Option<String>,
    pub message: String,
}

#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for MemoryNotifier {
    async fn send_to_all(&self, message: &str) -> Result<(), StorageError> {
        self.sent.lock().await.push(Notification { group: None, message: message.to_string() });
        Ok(())
    }

    async fn send_to_group(&self, group: &str, message: &str) -> Result<(), StorageError> {
        self.sent.lock().await.push(Notification {
            group: Some(group.to_string()),
            message: message.to_string(),
        });
        Ok(())
    }
}
