use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Per-entity collection contract shared by the Postgres and memory backends.
///
/// `find_by` matches a top-level field of the entity's JSON projection
/// (camelCase names such as `parentId`) against an exact JSON value.
#[async_trait]
pub trait Repository<E>: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<E>, DatabaseError>;

    async fn list(&self) -> Result<Vec<E>, DatabaseError>;

    async fn find_by(&self, field: &str, value: &Value) -> Result<Vec<E>, DatabaseError>;

    async fn insert(&self, entity: &E) -> Result<(), DatabaseError>;

    async fn update(&self, entity: &E) -> Result<(), DatabaseError>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;

    async fn exists(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.find(id).await?.is_some())
    }
}
