use futures::future::try_join_all;
use serde_json::json;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::{Database, DatabaseError};

/// Tenants the user is a member of. Empty when there are no memberships.
pub async fn tenants_for_user(db: &Database, user_id: Uuid) -> Result<BTreeSet<Uuid>, DatabaseError> {
    let rows = db.user_tenants.find_by("userId", &json!(user_id)).await?;
    Ok(rows.into_iter().map(|row| row.tenant_id).collect())
}

/// Locations reachable from any of `tenants` through the product offering join
pub async fn locations_for_tenants(db: &Database, tenants: &BTreeSet<Uuid>) -> Result<BTreeSet<Uuid>, DatabaseError> {
    let keys: Vec<_> = tenants.iter().map(|tenant_id| json!(tenant_id)).collect();
    let lookups = keys.iter().map(|key| db.tenant_locations.find_by("tenantId", key));
    let links = try_join_all(lookups).await?;

    Ok(links.into_iter().flatten().map(|link| link.location_id).collect())
}

/// Tenants linked to a single location
pub async fn location_tenants(db: &Database, location_id: Uuid) -> Result<BTreeSet<Uuid>, DatabaseError> {
    let links = db.tenant_locations.find_by("locationId", &json!(location_id)).await?;
    Ok(links.into_iter().map(|link| link.tenant_id).collect())
}
