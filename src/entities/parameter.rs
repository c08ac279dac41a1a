use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, Repository};
use crate::delta::Patch;
use crate::entities::{
    Audit, Creatable, Deletable, Effects, Entity, Fetchable, Location, ParameterType, Patchable, TenantScope,
    UnitType,
};
use crate::observer::{ForeignKey, NotNumericKey, Required, RulePipeline, Unique};
use crate::services::ServiceError;

/// A measured quantity at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: Uuid,
    pub location_id: Uuid,
    pub parameter_type_id: Uuid,
    pub unit_type_id: Uuid,
    pub limit_type_id: Option<Uuid>,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterDelta {
    pub id: Patch<Uuid>,
    pub location_id: Patch<Uuid>,
    pub parameter_type_id: Patch<Uuid>,
    pub unit_type_id: Patch<Uuid>,
    pub limit_type_id: Patch<Option<Uuid>>,
    pub name: Patch<String>,
}

/// Shared limit vocabulary, keyed by a translation key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitType {
    pub id: Uuid,
    pub i18n_key_name: String,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitTypeDelta {
    pub id: Patch<Uuid>,
    pub i18n_key_name: Patch<String>,
    pub name: Patch<String>,
}

impl Entity for Parameter {
    const TABLE: &'static str = "parameters";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.parameters
    }
}

impl Fetchable for Parameter {
    const SET: &'static str = "parameters";

    fn scope(&self) -> TenantScope {
        TenantScope::Location(self.location_id)
    }
}

impl Patchable for Parameter {
    type Delta = ParameterDelta;

    fn delta_id(delta: &ParameterDelta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &ParameterDelta) -> bool {
        delta.id.is_absent()
            && delta.location_id.is_absent()
            && delta.parameter_type_id.is_absent()
            && delta.unit_type_id.is_absent()
            && delta.limit_type_id.is_absent()
            && delta.name.is_absent()
    }

    fn apply(&mut self, delta: &ParameterDelta) {
        delta.location_id.apply_to(&mut self.location_id);
        delta.parameter_type_id.apply_to(&mut self.parameter_type_id);
        delta.unit_type_id.apply_to(&mut self.unit_type_id);
        delta.limit_type_id.apply_to(&mut self.limit_type_id);
        delta.name.apply_to(&mut self.name);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<Parameter>::new("name", |p| !p.name.trim().is_empty()))
            .with(Required::<Parameter>::new("locationId", |p| !p.location_id.is_nil()))
            .with(Required::<Parameter>::new("parameterTypeId", |p| !p.parameter_type_id.is_nil()))
            .with(Required::<Parameter>::new("unitTypeId", |p| !p.unit_type_id.is_nil()))
            .with(ForeignKey::<Parameter, Location>::new("locationId", |p| Some(p.location_id)))
            .with(ForeignKey::<Parameter, ParameterType>::new("parameterTypeId", |p| Some(p.parameter_type_id)))
            .with(ForeignKey::<Parameter, UnitType>::new("unitTypeId", |p| Some(p.unit_type_id)))
            .with(ForeignKey::<Parameter, LimitType>::new("limitTypeId", |p| p.limit_type_id))
    }
}

#[async_trait]
impl Creatable for Parameter {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            location_id: Uuid::nil(),
            parameter_type_id: Uuid::nil(),
            unit_type_id: Uuid::nil(),
            limit_type_id: None,
            name: String::new(),
            audit: Audit::default(),
        }
    }
}

impl Deletable for Parameter {}

impl Entity for LimitType {
    const TABLE: &'static str = "limit_types";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.limit_types
    }
}

impl Fetchable for LimitType {
    const SET: &'static str = "limittypes";

    fn scope(&self) -> TenantScope {
        TenantScope::Global
    }
}

impl Patchable for LimitType {
    type Delta = LimitTypeDelta;

    fn delta_id(delta: &LimitTypeDelta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &LimitTypeDelta) -> bool {
        delta.id.is_absent() && delta.i18n_key_name.is_absent() && delta.name.is_absent()
    }

    fn apply(&mut self, delta: &LimitTypeDelta) {
        delta.i18n_key_name.apply_to(&mut self.i18n_key_name);
        delta.name.apply_to(&mut self.name);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<LimitType>::new("name", |l| !l.name.trim().is_empty()))
            .with(Required::<LimitType>::new("i18nKeyName", |l| !l.i18n_key_name.trim().is_empty()))
            .with(NotNumericKey::<LimitType>::new("i18nKeyName", |l| l.i18n_key_name.as_str()))
            .with(Unique::<LimitType>::new("i18nKeyName", |l| l.i18n_key_name.as_str()).ignoring_case())
    }
}

#[async_trait]
impl Creatable for LimitType {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            i18n_key_name: String::new(),
            name: String::new(),
            audit: Audit::default(),
        }
    }

    /// Additions to the shared vocabulary go to every client
    async fn after_create(&self, effects: &Effects<'_>) -> Result<(), ServiceError> {
        effects
            .notifier
            .send_to_all(&format!("New limit type: {}", self.name))
            .await?;
        Ok(())
    }
}
