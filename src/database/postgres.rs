use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::repository::Repository;
use crate::entities::Entity;

/// Postgres repository storing each entity as a JSONB document keyed by id
pub struct PgRepository<E> {
    table: String,
    pool: PgPool,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: Entity> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            table: DatabaseManager::quote_identifier(E::TABLE),
            pool,
            _phantom: PhantomData,
        }
    }

    fn decode(row: &PgRow) -> Result<E, DatabaseError> {
        let data: Value = row.try_get("data")?;
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    async fn find(&self, id: Uuid) -> Result<Option<E>, DatabaseError> {
        let sql = format!("SELECT data FROM {} WHERE id = $1", self.table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn list(&self) -> Result<Vec<E>, DatabaseError> {
        let sql = format!("SELECT data FROM {} ORDER BY id", self.table);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn find_by(&self, field: &str, value: &Value) -> Result<Vec<E>, DatabaseError> {
        let sql = format!("SELECT data FROM {} WHERE data -> $1 = $2 ORDER BY id", self.table);
        let rows = sqlx::query(&sql)
            .bind(field)
            .bind(Json(value))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn insert(&self, entity: &E) -> Result<(), DatabaseError> {
        let sql = format!("INSERT INTO {} (id, data) VALUES ($1, $2)", self.table);
        let result = sqlx::query(&sql)
            .bind(entity.id())
            .bind(Json(entity))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(DatabaseError::Conflict(
                format!("{} {} already exists", E::TABLE, entity.id()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, entity: &E) -> Result<(), DatabaseError> {
        let sql = format!("UPDATE {} SET data = $2, updated_at = now() WHERE id = $1", self.table);
        let result = sqlx::query(&sql)
            .bind(entity.id())
            .bind(Json(entity))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {}", E::TABLE, entity.id())));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
