use anyhow::Context;
use serde_json::json;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;
use crate::database::{schema::{ensure_schema, ENTITY_TABLES}, DatabaseManager};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database)
        .await
        .context("failed to connect to database")?;
    ensure_schema(&pool).await.context("failed to create tables")?;
    DatabaseManager::close(&pool).await;

    output_success(
        output_format,
        "Schema ready",
        Some(json!({ "entity_tables": ENTITY_TABLES.len() })),
    )
}
