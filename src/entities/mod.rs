//! Entity types and the capability traits the generic facade is built on.
//!
//! An entity only gets the routes its capabilities allow: reference data
//! implements [`Fetchable`] alone, so create/patch/delete simply do not exist
//! for it.

pub mod dashboard;
pub mod location;
pub mod log_entry;
pub mod message;
pub mod parameter;
pub mod reference;
pub mod tenant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, DatabaseError, Repository};
use crate::delta::Patch;
use crate::observer::RulePipeline;
use crate::outcome::ErrorCode;
use crate::services::ServiceError;
use crate::storage::NotificationSender;

pub use dashboard::{Dashboard, DashboardDelta, DashboardOption, DashboardOptionDelta};
pub use location::{Location, LocationDelta};
pub use log_entry::{LocationLogEntry, LocationLogEntryDelta};
pub use message::{InAppMessage, InAppMessageDelta};
pub use parameter::{LimitType, LimitTypeDelta, Parameter, ParameterDelta};
pub use reference::{ChemicalFormType, ParameterType, UnitType, UnitTypeGroup};
pub use tenant::{ProductOfferingTenantLocation, Tenant, UserTenant};

/// How an entity is bound to tenants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Direct tenant column
    Tenant(Uuid),
    /// Tenant derived through the ProductOfferingTenantLocation join
    Location(Uuid),
    /// Shared reference data
    Global,
}

/// Audit columns, written only by the facade pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created_by_id: Uuid,
    pub created_on: DateTime<Utc>,
    pub modified_by_id: Uuid,
    pub modified_on: DateTime<Utc>,
}

impl Audit {
    pub fn stamp_created(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        self.created_by_id = user_id;
        self.created_on = now;
        self.stamp_modified(user_id, now);
    }

    pub fn stamp_modified(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        self.modified_by_id = user_id;
        self.modified_on = now;
    }
}

/// Anything persisted through a `Repository`
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Uuid;

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>>;
}

/// Readable through the API, subject to tenant scoping
pub trait Fetchable: Entity {
    /// Entity set name used in routes (`/api/{SET}`)
    const SET: &'static str;

    fn scope(&self) -> TenantScope;
}

/// Updatable with a sparse delta
pub trait Patchable: Fetchable {
    type Delta: DeserializeOwned + Debug + Send + Sync + 'static;

    fn delta_id(delta: &Self::Delta) -> &Patch<Uuid>;

    fn delta_is_empty(delta: &Self::Delta) -> bool;

    /// Copy present fields onto `self`. Never touches `id` or audit columns.
    fn apply(&mut self, delta: &Self::Delta);

    fn audit_mut(&mut self) -> &mut Audit;

    fn rules() -> RulePipeline<Self>;
}

/// Side-effect handles available once a create has been persisted
pub struct Effects<'a> {
    pub db: &'a Database,
    pub notifier: &'a dyn NotificationSender,
    pub user_id: Uuid,
}

#[async_trait]
pub trait Creatable: Patchable {
    /// Starting point a create delta is applied onto
    fn blank(id: Uuid) -> Self;

    async fn after_create(&self, _effects: &Effects<'_>) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
pub trait Deletable: Fetchable {
    /// An error when other rows still depend on this one
    async fn blocking_dependents(&self, _db: &Database) -> Result<Option<ErrorCode>, DatabaseError> {
        Ok(None)
    }

    async fn after_delete(&self, _db: &Database) -> Result<(), DatabaseError> {
        Ok(())
    }
}
