use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use super::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "FFCO API",
            "version": version,
            "description": "Multi-tenant configuration backend with OData-style queries",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "entities": "/api/:set[/:id] (bearer token)",
                "upload": "/api/{operation,plant}configurations/upload (bearer token, multipart)",
                "export": "/api/{operation,plant}configurations/export (bearer token)",
                "transactions": "/api/transactions/:id[/file] (bearer token)",
            }
        }
    }))
}

/// GET /health - storage backend reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let db = state.entities.database();

    match db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": db.backend_name()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": db.backend_name()
                    }
                })),
            )
        }
    }
}
