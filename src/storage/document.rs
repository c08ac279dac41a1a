use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, StorageError};

fn with_id(mut item: Value, id: Uuid) -> Value {
    if let Value::Object(map) = &mut item {
        map.insert("id".to_string(), Value::String(id.to_string()));
    }
    item
}

/// Documents in the `documents` table, one JSONB row per item
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_item(&self, collection: &str, item: Value) -> Result<Uuid, StorageError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, collection, data) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(Json(with_id(item, id)))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn get_item(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let Json(data): Json<Value> = row.try_get("data")?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    items: RwLock<HashMap<(String, Uuid), Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_item(&self, collection: &str, item: Value) -> Result<Uuid, StorageError> {
        let id = Uuid::new_v4();
        self.items
            .write()
            .await
            .insert((collection.to_string(), id), with_id(item, id));
        Ok(id)
    }

    async fn get_item(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StorageError> {
        Ok(self.items.read().await.get(&(collection.to_string(), id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn store_assigns_ids_per_collection() {
        let store = MemoryDocumentStore::new();
        let id = store.create_item("transactions", json!({"kind": "plant"})).await.unwrap();

        let item = store.get_item("transactions", id).await.unwrap().unwrap();
        assert_eq!(item["id"], json!(id.to_string()));
        assert!(store.get_item("exports", id).await.unwrap().is_none());
    }
}
