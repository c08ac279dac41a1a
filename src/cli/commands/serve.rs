use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::auth::issue_token;
use crate::config::config;
use crate::database::{schema::ensure_schema, seed::seed, Database, DatabaseManager};
use crate::handlers::{router, AppState};
use crate::storage::Storage;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides FFCO_API_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Serve seeded demo data from memory instead of Postgres")]
    pub memory: bool,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    info!("Starting FFCO API in {:?} mode", config.environment);

    let (db, storage) = if args.memory || config.database.use_memory {
        let db = Database::memory();
        let demo = seed(&db).await.context("failed to seed demo data")?;
        match issue_token(demo.user, Some("demo".to_string()), &config.security) {
            Ok(token) => info!("Demo user {} token: {}", demo.user, token),
            Err(e) => tracing::warn!("Could not mint demo token: {}", e),
        }
        (db, Storage::memory())
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        ensure_schema(&pool).await.context("failed to prepare schema")?;
        let storage = Storage::persistent(&config.storage, pool.clone());
        (Database::postgres(pool), storage)
    };
    info!("Using {} storage backend", db.backend_name());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let app = router(AppState::new(config, db.clone(), storage));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("FFCO API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pool) = db.pool() {
        DatabaseManager::close(pool).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
