use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, DatabaseError, Repository};
use crate::delta::Patch;
use crate::entities::{
    Audit, Creatable, Deletable, Effects, Entity, Fetchable, LocationLogEntry, Parameter, Patchable,
    ProductOfferingTenantLocation, TenantScope,
};
use crate::observer::{AcyclicParent, ForeignKey, Required, RulePipeline};
use crate::outcome::ErrorCode;
use crate::services::ServiceError;

/// A node in the plant/operation hierarchy. Tenants reach locations through
/// `ProductOfferingTenantLocation` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub location_type: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationDelta {
    pub id: Patch<Uuid>,
    pub name: Patch<String>,
    pub parent_id: Patch<Option<Uuid>>,
    pub location_type: Patch<Option<String>>,
    pub is_active: Patch<bool>,
}

impl Entity for Location {
    const TABLE: &'static str = "locations";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.locations
    }
}

impl Fetchable for Location {
    const SET: &'static str = "locations";

    fn scope(&self) -> TenantScope {
        TenantScope::Location(self.id)
    }
}

impl Patchable for Location {
    type Delta = LocationDelta;

    fn delta_id(delta: &LocationDelta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &LocationDelta) -> bool {
        delta.id.is_absent()
            && delta.name.is_absent()
            && delta.parent_id.is_absent()
            && delta.location_type.is_absent()
            && delta.is_active.is_absent()
    }

    fn apply(&mut self, delta: &LocationDelta) {
        delta.name.apply_to(&mut self.name);
        delta.parent_id.apply_to(&mut self.parent_id);
        delta.location_type.apply_to(&mut self.location_type);
        delta.is_active.apply_to(&mut self.is_active);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<Location>::new("name", |l| !l.name.trim().is_empty()))
            .with(Required::<Location>::new("parentId", |l| l.parent_id.is_some()).on_create())
            .with(ForeignKey::<Location, Location>::new("parentId", |l| l.parent_id))
            .with(AcyclicParent::<Location>::new("parentId", |l| l.parent_id))
    }
}

#[async_trait]
impl Creatable for Location {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
            parent_id: None,
            location_type: None,
            is_active: true,
            audit: Audit::default(),
        }
    }

    /// A new location is reachable by every tenant that reaches its parent
    async fn after_create(&self, effects: &Effects<'_>) -> Result<(), ServiceError> {
        let Some(parent_id) = self.parent_id else {
            return Ok(());
        };

        let links = effects.db.tenant_locations.find_by("locationId", &json!(parent_id)).await?;
        for link in &links {
            let inherited = ProductOfferingTenantLocation::new(link.product_offering_id, link.tenant_id, self.id);
            effects.db.tenant_locations.insert(&inherited).await?;
        }
        tracing::debug!("Location {} inherited {} tenant link(s) from {}", self.id, links.len(), parent_id);
        Ok(())
    }
}

#[async_trait]
impl Deletable for Location {
    async fn blocking_dependents(&self, db: &Database) -> Result<Option<ErrorCode>, DatabaseError> {
        let id = json!(self.id);

        if !db.locations.find_by("parentId", &id).await?.is_empty() {
            return Ok(Some(ErrorCode::could_not_delete(format!(
                "location {} still has child locations",
                self.id
            ))));
        }
        if !LocationLogEntry::repository(db).find_by("locationId", &id).await?.is_empty() {
            return Ok(Some(ErrorCode::could_not_delete(format!(
                "location {} still has log entries",
                self.id
            ))));
        }
        if !Parameter::repository(db).find_by("locationId", &id).await?.is_empty() {
            return Ok(Some(ErrorCode::could_not_delete(format!(
                "location {} still has parameters",
                self.id
            ))));
        }
        Ok(None)
    }

    async fn after_delete(&self, db: &Database) -> Result<(), DatabaseError> {
        for link in db.tenant_locations.find_by("locationId", &json!(self.id)).await? {
            db.tenant_locations.delete(link.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_never_touches_audit_or_id() {
        let mut location = Location::blank(Uuid::new_v4());
        let before = location.clone();
        let delta: LocationDelta =
            serde_json::from_str(r#"{"id": "00000000-0000-0000-0000-000000000001", "locationType": "line"}"#).unwrap();

        location.apply(&delta);
        assert_eq!(location.id, before.id);
        assert_eq!(location.audit, before.audit);
        assert_eq!(location.location_type.as_deref(), Some("line"));
        assert_eq!(location.name, before.name);
        assert_eq!(location.parent_id, before.parent_id);
    }

    #[test]
    fn empty_object_is_an_empty_delta() {
        let delta: LocationDelta = serde_json::from_str("{}").unwrap();
        assert!(Location::delta_is_empty(&delta));
        let delta: LocationDelta = serde_json::from_str(r#"{"isActive": false}"#).unwrap();
        assert!(!Location::delta_is_empty(&delta));
    }

    #[test]
    fn pipeline_registers_all_rules() {
        assert_eq!(Location::rules().len(), 4);
    }
}
