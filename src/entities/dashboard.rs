use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, DatabaseError, Repository};
use crate::delta::Patch;
use crate::entities::{Audit, Creatable, Deletable, Entity, Fetchable, Patchable, TenantScope};
use crate::observer::{ForeignKey, Required, Rule, RuleContext, RulePipeline, RuleRing, TenantBinding};
use crate::outcome::{ErrorCode, ValidationResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub dashboard_option_id: Option<Uuid>,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardDelta {
    pub id: Patch<Uuid>,
    pub tenant_id: Patch<Uuid>,
    pub dashboard_option_id: Patch<Option<Uuid>>,
    pub name: Patch<String>,
}

/// Per-tenant dashboard settings; `options` is an opaque JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOption {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub options: Value,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardOptionDelta {
    pub id: Patch<Uuid>,
    pub tenant_id: Patch<Uuid>,
    pub options: Patch<Value>,
}

impl Entity for Dashboard {
    const TABLE: &'static str = "dashboards";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.dashboards
    }
}

impl Fetchable for Dashboard {
    const SET: &'static str = "dashboards";

    fn scope(&self) -> TenantScope {
        TenantScope::Tenant(self.tenant_id)
    }
}

/// The referenced option must belong to the dashboard's own tenant
struct OptionInSameTenant;

#[async_trait]
impl Rule<Dashboard> for OptionInSameTenant {
    fn name(&self) -> &'static str {
        "OptionInSameTenant"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::ForeignKey
    }

    async fn check(
        &self,
        snapshot: &Dashboard,
        ctx: &RuleContext<'_, Dashboard>,
        result: &mut ValidationResult,
    ) -> Result<(), DatabaseError> {
        let Some(option_id) = snapshot.dashboard_option_id else {
            return Ok(());
        };
        // Missing options are reported by the foreign key rule
        if let Some(option) = ctx.db.dashboard_options.find(option_id).await? {
            if option.tenant_id != snapshot.tenant_id {
                result.push(ErrorCode::tenant_mismatch(
                    "dashboardOptionId",
                    format!("dashboard option {} belongs to another tenant", option_id),
                ));
            }
        }
        Ok(())
    }
}

impl Patchable for Dashboard {
    type Delta = DashboardDelta;

    fn delta_id(delta: &DashboardDelta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &DashboardDelta) -> bool {
        delta.id.is_absent()
            && delta.tenant_id.is_absent()
            && delta.dashboard_option_id.is_absent()
            && delta.name.is_absent()
    }

    fn apply(&mut self, delta: &DashboardDelta) {
        delta.tenant_id.apply_to(&mut self.tenant_id);
        delta.dashboard_option_id.apply_to(&mut self.dashboard_option_id);
        delta.name.apply_to(&mut self.name);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<Dashboard>::new("name", |d| !d.name.trim().is_empty()))
            .with(Required::<Dashboard>::new("tenantId", |d| !d.tenant_id.is_nil()))
            .with(TenantBinding::<Dashboard>::new("tenantId", |d| d.tenant_id))
            .with(ForeignKey::<Dashboard, DashboardOption>::new("dashboardOptionId", |d| d.dashboard_option_id))
            .with(OptionInSameTenant)
    }
}

#[async_trait]
impl Creatable for Dashboard {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            tenant_id: Uuid::nil(),
            dashboard_option_id: None,
            name: String::new(),
            audit: Audit::default(),
        }
    }
}

impl Deletable for Dashboard {}

impl Entity for DashboardOption {
    const TABLE: &'static str = "dashboard_options";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.dashboard_options
    }
}

impl Fetchable for DashboardOption {
    const SET: &'static str = "dashboardoptions";

    fn scope(&self) -> TenantScope {
        TenantScope::Tenant(self.tenant_id)
    }
}

impl Patchable for DashboardOption {
    type Delta = DashboardOptionDelta;

    fn delta_id(delta: &DashboardOptionDelta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &DashboardOptionDelta) -> bool {
        delta.id.is_absent() && delta.tenant_id.is_absent() && delta.options.is_absent()
    }

    fn apply(&mut self, delta: &DashboardOptionDelta) {
        delta.tenant_id.apply_to(&mut self.tenant_id);
        delta.options.apply_to(&mut self.options);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<DashboardOption>::new("options", |o| !o.options.is_null()))
            .with(Required::<DashboardOption>::new("tenantId", |o| !o.tenant_id.is_nil()))
            .with(TenantBinding::<DashboardOption>::new("tenantId", |o| o.tenant_id))
    }
}

#[async_trait]
impl Creatable for DashboardOption {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            tenant_id: Uuid::nil(),
            options: Value::Null,
            audit: Audit::default(),
        }
    }
}

#[async_trait]
impl Deletable for DashboardOption {
    async fn blocking_dependents(&self, db: &Database) -> Result<Option<ErrorCode>, DatabaseError> {
        let users = db.dashboards.find_by("dashboardOptionId", &json!(self.id)).await?;
        if users.is_empty() {
            return Ok(None);
        }
        Ok(Some(ErrorCode::could_not_delete(format!(
            "dashboard option {} is used by {} dashboard(s)",
            self.id,
            users.len()
        ))))
    }
}
