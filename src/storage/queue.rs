use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{MessageQueue, StorageError};

/// Outbox-style queue: messages land in `queue_messages` for a worker to claim
pub struct PgMessageQueue {
    pool: PgPool,
}

impl PgMessageQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageQueue for PgMessageQueue {
    async fn enqueue(&self, queue: &str, body: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO queue_messages (queue, body) VALUES ($1, $2)")
            .bind(queue)
            .bind(body)
            .execute(&self.pool)
            .await?;
        tracing::debug!("Enqueued message on {}", queue);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<(String, String)>>,
    unavailable: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `enqueue` fail, as if the broker were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// `(queue, body)` pairs in enqueue order
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn enqueue(&self, queue: &str, body: &str) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("queue {}", queue)));
        }
        self.messages.lock().await.push((queue.to_string(), body.to_string()));
        Ok(())
    }
}
