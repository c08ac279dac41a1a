pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod schema;
pub mod seed;

use sqlx::PgPool;
use std::sync::Arc;

use crate::entities::{
    ChemicalFormType, Dashboard, DashboardOption, Entity, InAppMessage, LimitType, Location, LocationLogEntry,
    Parameter, ParameterType, ProductOfferingTenantLocation, Tenant, UnitType, UnitTypeGroup, UserTenant,
};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryRepository;
pub use postgres::PgRepository;
pub use repository::Repository;

#[derive(Clone)]
enum Backend {
    Memory,
    Postgres(PgPool),
}

/// One repository per entity table, all sharing a single backend
#[derive(Clone)]
pub struct Database {
    backend: Backend,
    pub tenants: Arc<dyn Repository<Tenant>>,
    pub user_tenants: Arc<dyn Repository<UserTenant>>,
    pub tenant_locations: Arc<dyn Repository<ProductOfferingTenantLocation>>,
    pub locations: Arc<dyn Repository<Location>>,
    pub location_log_entries: Arc<dyn Repository<LocationLogEntry>>,
    pub dashboards: Arc<dyn Repository<Dashboard>>,
    pub dashboard_options: Arc<dyn Repository<DashboardOption>>,
    pub parameters: Arc<dyn Repository<Parameter>>,
    pub limit_types: Arc<dyn Repository<LimitType>>,
    pub in_app_messages: Arc<dyn Repository<InAppMessage>>,
    pub unit_types: Arc<dyn Repository<UnitType>>,
    pub unit_type_groups: Arc<dyn Repository<UnitTypeGroup>>,
    pub parameter_types: Arc<dyn Repository<ParameterType>>,
    pub chemical_form_types: Arc<dyn Repository<ChemicalFormType>>,
}

fn memory<E: Entity>() -> Arc<dyn Repository<E>> {
    Arc::new(MemoryRepository::<E>::new())
}

fn postgres<E: Entity>(pool: &PgPool) -> Arc<dyn Repository<E>> {
    Arc::new(PgRepository::<E>::new(pool.clone()))
}

impl Database {
    /// Empty in-process database
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory,
            tenants: memory(),
            user_tenants: memory(),
            tenant_locations: memory(),
            locations: memory(),
            location_log_entries: memory(),
            dashboards: memory(),
            dashboard_options: memory(),
            parameters: memory(),
            limit_types: memory(),
            in_app_messages: memory(),
            unit_types: memory(),
            unit_type_groups: memory(),
            parameter_types: memory(),
            chemical_form_types: memory(),
        }
    }

    /// JSONB tables in Postgres; see `schema::ensure_schema`
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            tenants: postgres(&pool),
            user_tenants: postgres(&pool),
            tenant_locations: postgres(&pool),
            locations: postgres(&pool),
            location_log_entries: postgres(&pool),
            dashboards: postgres(&pool),
            dashboard_options: postgres(&pool),
            parameters: postgres(&pool),
            limit_types: postgres(&pool),
            in_app_messages: postgres(&pool),
            unit_types: postgres(&pool),
            unit_type_groups: postgres(&pool),
            parameter_types: postgres(&pool),
            chemical_form_types: postgres(&pool),
            backend: Backend::Postgres(pool),
        }
    }

    pub fn pool(&self) -> Option<&PgPool> {
        match &self.backend {
            Backend::Postgres(pool) => Some(pool),
            Backend::Memory => None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory => "memory",
            Backend::Postgres(_) => "postgres",
        }
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        match &self.backend {
            Backend::Memory => Ok(()),
            Backend::Postgres(pool) => DatabaseManager::health_check(pool).await,
        }
    }
}
