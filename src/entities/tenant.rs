use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, Repository};
use crate::entities::{Entity, Fetchable, TenantScope};

/// An organizational boundary. Callers only see the tenants they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
}

impl Entity for Tenant {
    const TABLE: &'static str = "tenants";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.tenants
    }
}

impl Fetchable for Tenant {
    const SET: &'static str = "tenants";

    fn scope(&self) -> TenantScope {
        TenantScope::Tenant(self.id)
    }
}

/// Membership row: user `user_id` belongs to tenant `tenant_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTenant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
}

impl UserTenant {
    pub fn new(user_id: Uuid, tenant_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), user_id, tenant_id }
    }
}

impl Entity for UserTenant {
    const TABLE: &'static str = "user_tenants";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.user_tenants
    }
}

/// Join row granting a tenant access to a location through a product offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOfferingTenantLocation {
    pub id: Uuid,
    pub product_offering_id: Uuid,
    pub tenant_id: Uuid,
    pub location_id: Uuid,
}

impl ProductOfferingTenantLocation {
    pub fn new(product_offering_id: Uuid, tenant_id: Uuid, location_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_offering_id,
            tenant_id,
            location_id,
        }
    }
}

impl Entity for ProductOfferingTenantLocation {
    const TABLE: &'static str = "product_offering_tenant_locations";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.tenant_locations
    }
}
