//! External collaborators the upload pipeline and entity hooks talk to:
//! blob storage, a document store, a message queue and a notification hub.
//! Each has a Postgres/filesystem implementation and an in-memory one.

pub mod blob;
pub mod document;
pub mod notify;
pub mod queue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

pub use blob::{sha256_hex, FsBlobStore, MemoryBlobStore};
pub use document::{MemoryDocumentStore, PgDocumentStore};
pub use notify::{LogNotifier, MemoryNotifier, Notification};
pub use queue::{MemoryQueue, PgMessageQueue};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Where a stored blob ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHandle {
    pub name: String,
    pub size: u64,
    pub url: String,
    pub checksum: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<BlobHandle, StorageError>;

    async fn download(&self, name: &str) -> Result<Vec<u8>, StorageError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist `item` into `collection`; the store assigns and returns its id
    async fn create_item(&self, collection: &str, item: Value) -> Result<Uuid, StorageError>;

    async fn get_item(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StorageError>;
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn enqueue(&self, queue: &str, body: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_to_all(&self, message: &str) -> Result<(), StorageError>;

    async fn send_to_group(&self, group: &str, message: &str) -> Result<(), StorageError>;
}

/// The collaborator set shared by every request
#[derive(Clone)]
pub struct Storage {
    pub blobs: Arc<dyn BlobStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub queue: Arc<dyn MessageQueue>,
    pub notifier: Arc<dyn NotificationSender>,
}

impl Storage {
    /// Everything in process; nothing survives a restart
    pub fn memory() -> Self {
        Self {
            blobs: Arc::new(MemoryBlobStore::new("memory://blobs")),
            documents: Arc::new(MemoryDocumentStore::new()),
            queue: Arc::new(MemoryQueue::new()),
            notifier: Arc::new(MemoryNotifier::new()),
        }
    }

    /// Blobs on disk, documents and queue messages in Postgres
    pub fn persistent(config: &StorageConfig, pool: PgPool) -> Self {
        Self {
            blobs: Arc::new(FsBlobStore::new(&config.blob_root, &config.blob_container, &config.blob_base_url)),
            documents: Arc::new(PgDocumentStore::new(pool.clone())),
            queue: Arc::new(PgMessageQueue::new(pool)),
            notifier: Arc::new(LogNotifier::new(&config.notification_hub)),
        }
    }
}
