// Two handler tiers:
// Public (no principal needed) → Protected (everything under /api, principal resolved by middleware)
//
// Protected routes never reject a missing token at the middleware; the
// facades answer with a structured 401 instead.

pub mod protected;
pub mod public;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::Database;
use crate::entities::{
    ChemicalFormType, Creatable, Dashboard, DashboardOption, Deletable, Fetchable, InAppMessage, LimitType, Location,
    LocationLogEntry, Parameter, ParameterType, Tenant, UnitType, UnitTypeGroup,
};
use crate::middleware::principal_middleware;
use crate::services::{EntityService, UploadService};
use crate::storage::Storage;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub entities: EntityService,
    pub uploads: UploadService,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, storage: Storage) -> Self {
        let entities = EntityService::new(db.clone(), storage.notifier.clone(), config.query.clone());
        let uploads = UploadService::new(db, storage, config.storage.clone());
        Self {
            config: Arc::new(config),
            entities,
            uploads,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Reference data: fetch only
        .merge(read_only::<Tenant>())
        .merge(read_only::<UnitType>())
        .merge(read_only::<UnitTypeGroup>())
        .merge(read_only::<ParameterType>())
        .merge(read_only::<ChemicalFormType>())
        // Create and patch, never delete
        .merge(writable::<LimitType>())
        // Full CRUD
        .merge(full_crud::<Location>())
        .merge(full_crud::<LocationLogEntry>())
        .merge(full_crud::<Dashboard>())
        .merge(full_crud::<DashboardOption>())
        .merge(full_crud::<Parameter>())
        .merge(full_crud::<InAppMessage>())
        .merge(upload_routes())
        .layer(middleware::from_fn_with_state(state.clone(), principal_middleware))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes));

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(api)
        .layer(cors_layer(&state.config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn read_only<E: Fetchable>() -> Router<AppState> {
    use protected::entity;

    Router::new()
        .route(&format!("/api/{}", E::SET), get(entity::list::<E>))
        .route(&format!("/api/{}/:id", E::SET), get(entity::get::<E>))
}

fn writable<E: Creatable>() -> Router<AppState> {
    use protected::entity;

    Router::new()
        .route(&format!("/api/{}", E::SET), get(entity::list::<E>).post(entity::create::<E>))
        .route(&format!("/api/{}/:id", E::SET), get(entity::get::<E>).patch(entity::patch::<E>))
}

fn full_crud<E: Creatable + Deletable>() -> Router<AppState> {
    use protected::entity;

    Router::new()
        .route(&format!("/api/{}", E::SET), get(entity::list::<E>).post(entity::create::<E>))
        .route(
            &format!("/api/{}/:id", E::SET),
            get(entity::get::<E>)
                .patch(entity::patch::<E>)
                .delete(entity::delete::<E>),
        )
}

fn upload_routes() -> Router<AppState> {
    use protected::upload;

    Router::new()
        .route("/api/operationconfigurations/upload", post(upload::upload_operation_configuration))
        .route("/api/plantconfigurations/upload", post(upload::upload_plant_configuration))
        .route("/api/operationconfigurations/export", post(upload::export_operation_configuration))
        .route("/api/plantconfigurations/export", post(upload::export_plant_configuration))
        .route("/api/transactions/:id", get(upload::transaction_get))
        .route("/api/transactions/:id/file", get(upload::transaction_file))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(allowed).allow_methods(Any).allow_headers(Any)
}
