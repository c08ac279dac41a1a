use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::{Database, DatabaseError};
use crate::entities::{Fetchable, TenantScope};
use crate::tenancy::membership::{locations_for_tenants, tenants_for_user};

/// What one caller may see, resolved once at the start of an operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessScope {
    pub user_id: Uuid,
    tenants: BTreeSet<Uuid>,
    locations: BTreeSet<Uuid>,
}

impl AccessScope {
    pub async fn resolve(db: &Database, user_id: Uuid) -> Result<Self, DatabaseError> {
        let tenants = tenants_for_user(db, user_id).await?;
        let locations = locations_for_tenants(db, &tenants).await?;
        tracing::debug!(
            "User {} resolved to {} tenant(s), {} location(s)",
            user_id,
            tenants.len(),
            locations.len()
        );
        Ok(Self { user_id, tenants, locations })
    }

    pub fn from_parts(user_id: Uuid, tenants: BTreeSet<Uuid>, locations: BTreeSet<Uuid>) -> Self {
        Self { user_id, tenants, locations }
    }

    pub fn tenants(&self) -> &BTreeSet<Uuid> {
        &self.tenants
    }

    pub fn belongs_to(&self, tenant_id: Uuid) -> bool {
        self.tenants.contains(&tenant_id)
    }

    pub fn can_reach_location(&self, location_id: Uuid) -> bool {
        self.locations.contains(&location_id)
    }

    /// Global rows are readable by anyone but only members of some tenant may change them
    pub fn may_change(&self, scope: &TenantScope) -> bool {
        match scope {
            TenantScope::Global => !self.tenants.is_empty(),
            other => self.permits(other),
        }
    }

    pub fn permits(&self, scope: &TenantScope) -> bool {
        match scope {
            TenantScope::Tenant(tenant_id) => self.belongs_to(*tenant_id),
            TenantScope::Location(location_id) => self.can_reach_location(*location_id),
            TenantScope::Global => true,
        }
    }
}

/// Every row of `E` the caller may see
pub async fn visible_entities<E: Fetchable>(db: &Database, scope: &AccessScope) -> Result<Vec<E>, DatabaseError> {
    let rows = E::repository(db).list().await?;
    Ok(rows.into_iter().filter(|row| scope.permits(&row.scope())).collect())
}

/// A single row, or `None` when it is missing or outside the caller's tenants.
/// The two cases are indistinguishable to the caller.
pub async fn visible_entity<E: Fetchable>(
    db: &Database,
    scope: &AccessScope,
    id: Uuid,
) -> Result<Option<E>, DatabaseError> {
    let row = E::repository(db).find(id).await?;
    Ok(row.filter(|row| scope.permits(&row.scope())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::seed::seed;
    use crate::entities::{Dashboard, Location, UnitType};

    #[tokio::test]
    async fn out_of_scope_rows_look_missing() {
        let db = Database::memory();
        let demo = seed(&db).await.unwrap();
        let scope = AccessScope::resolve(&db, demo.user).await.unwrap();

        let foreign: Option<Location> = visible_entity(&db, &scope, demo.site_b).await.unwrap();
        let missing: Option<Location> = visible_entity(&db, &scope, Uuid::new_v4()).await.unwrap();
        assert_eq!(foreign, missing);

        let own: Option<Location> = visible_entity(&db, &scope, demo.site_a).await.unwrap();
        assert!(own.is_some());
    }

    #[tokio::test]
    async fn no_memberships_sees_only_global_rows() {
        let db = Database::memory();
        seed(&db).await.unwrap();
        let scope = AccessScope::resolve(&db, Uuid::new_v4()).await.unwrap();

        let locations: Vec<Location> = visible_entities(&db, &scope).await.unwrap();
        let dashboards: Vec<Dashboard> = visible_entities(&db, &scope).await.unwrap();
        let units: Vec<UnitType> = visible_entities(&db, &scope).await.unwrap();
        assert!(locations.is_empty());
        assert!(dashboards.is_empty());
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn permits_matches_each_scope_kind() {
        let tenant = Uuid::new_v4();
        let location = Uuid::new_v4();
        let scope = AccessScope::from_parts(Uuid::new_v4(), BTreeSet::from([tenant]), BTreeSet::from([location]));

        assert!(scope.permits(&TenantScope::Tenant(tenant)));
        assert!(scope.permits(&TenantScope::Location(location)));
        assert!(scope.permits(&TenantScope::Global));
        assert!(!scope.permits(&TenantScope::Tenant(Uuid::new_v4())));
        assert!(!scope.permits(&TenantScope::Location(Uuid::new_v4())));
    }

    #[test]
    fn global_rows_change_only_with_a_membership() {
        let tenant = Uuid::new_v4();
        let member = AccessScope::from_parts(Uuid::new_v4(), BTreeSet::from([tenant]), BTreeSet::new());
        let stranger = AccessScope::from_parts(Uuid::new_v4(), BTreeSet::new(), BTreeSet::new());

        assert!(member.may_change(&TenantScope::Global));
        assert!(!stranger.may_change(&TenantScope::Global));
        assert!(stranger.permits(&TenantScope::Global));
        assert!(!member.may_change(&TenantScope::Tenant(Uuid::new_v4())));
        assert!(member.may_change(&TenantScope::Tenant(tenant)));
    }
}
