use sqlx::PgPool;
use tracing::info;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::entities::{
    ChemicalFormType, Dashboard, DashboardOption, Entity, InAppMessage, LimitType, Location, LocationLogEntry,
    Parameter, ParameterType, ProductOfferingTenantLocation, Tenant, UnitType, UnitTypeGroup, UserTenant,
};

/// Every table backed by a `PgRepository`
pub const ENTITY_TABLES: &[&str] = &[
    Tenant::TABLE,
    UserTenant::TABLE,
    ProductOfferingTenantLocation::TABLE,
    Location::TABLE,
    LocationLogEntry::TABLE,
    Dashboard::TABLE,
    DashboardOption::TABLE,
    Parameter::TABLE,
    LimitType::TABLE,
    InAppMessage::TABLE,
    UnitType::TABLE,
    UnitTypeGroup::TABLE,
    ParameterType::TABLE,
    ChemicalFormType::TABLE,
];

/// Create entity, document and queue tables when they are missing
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for table in ENTITY_TABLES {
        let table_ident = DatabaseManager::quote_identifier(table);
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            table_ident
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    // Lookups by foreign key go through `data -> field`
    for (table, field) in [
        (UserTenant::TABLE, "userId"),
        (ProductOfferingTenantLocation::TABLE, "tenantId"),
        (ProductOfferingTenantLocation::TABLE, "locationId"),
        (Location::TABLE, "parentId"),
    ] {
        let ddl = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ((data -> '{}'))",
            DatabaseManager::quote_identifier(&format!("idx_{}_{}", table, field.to_ascii_lowercase())),
            DatabaseManager::quote_identifier(table),
            field
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY,
            collection TEXT NOT NULL,
            data JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS queue_messages (
            id BIGSERIAL PRIMARY KEY,
            queue TEXT NOT NULL,
            body TEXT NOT NULL,
            enqueued_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            dequeued_at TIMESTAMPTZ
        )",
    )
    .execute(pool)
    .await?;

    info!("Schema ensured for {} entity tables", ENTITY_TABLES.len());
    Ok(())
}
