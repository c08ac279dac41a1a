use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::Repository;
use crate::entities::Entity;

/// In-process repository used by `serve --memory` and the test suites
pub struct MemoryRepository<E> {
    rows: Arc<RwLock<BTreeMap<Uuid, E>>>,
}

impl<E> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn find(&self, id: Uuid) -> Result<Option<E>, DatabaseError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<E>, DatabaseError> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn find_by(&self, field: &str, value: &Value) -> Result<Vec<E>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut matches = Vec::new();
        for row in rows.values() {
            let projection = serde_json::to_value(row)?;
            if projection.get(field) == Some(value) {
                matches.push(row.clone());
            }
        }
        Ok(matches)
    }

    async fn insert(&self, entity: &E) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entity.id()) {
            return Err(DatabaseError::Conflict(format!("{} {} already exists", E::TABLE, entity.id())));
        }
        rows.insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &E) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&entity.id()) {
            Some(row) => {
                *row = entity.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound(format!("{} {}", E::TABLE, entity.id()))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}
