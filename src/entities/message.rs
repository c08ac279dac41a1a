use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, Repository};
use crate::delta::Patch;
use crate::entities::{Audit, Creatable, Deletable, Effects, Entity, Fetchable, Patchable, TenantScope};
use crate::observer::{Required, RulePipeline, TenantBinding};
use crate::services::ServiceError;

/// Banner message shown to every user of a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessage {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subject: String,
    pub body: String,
    pub is_active: bool,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InAppMessageDelta {
    pub id: Patch<Uuid>,
    pub tenant_id: Patch<Uuid>,
    pub subject: Patch<String>,
    pub body: Patch<String>,
    pub is_active: Patch<bool>,
}

/// Notification group every member of a tenant listens on
pub fn tenant_group(tenant_id: Uuid) -> String {
    format!("tenant-{}", tenant_id)
}

impl Entity for InAppMessage {
    const TABLE: &'static str = "in_app_messages";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.in_app_messages
    }
}

impl Fetchable for InAppMessage {
    const SET: &'static str = "inappmessages";

    fn scope(&self) -> TenantScope {
        TenantScope::Tenant(self.tenant_id)
    }
}

impl Patchable for InAppMessage {
    type Delta = InAppMessageDelta;

    fn delta_id(delta: &InAppMessageDelta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &InAppMessageDelta) -> bool {
        delta.id.is_absent()
            && delta.tenant_id.is_absent()
            && delta.subject.is_absent()
            && delta.body.is_absent()
            && delta.is_active.is_absent()
    }

    fn apply(&mut self, delta: &InAppMessageDelta) {
        delta.tenant_id.apply_to(&mut self.tenant_id);
        delta.subject.apply_to(&mut self.subject);
        delta.body.apply_to(&mut self.body);
        delta.is_active.apply_to(&mut self.is_active);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<InAppMessage>::new("subject", |m| !m.subject.trim().is_empty()))
            .with(Required::<InAppMessage>::new("body", |m| !m.body.trim().is_empty()))
            .with(Required::<InAppMessage>::new("tenantId", |m| !m.tenant_id.is_nil()))
            .with(TenantBinding::<InAppMessage>::new("tenantId", |m| m.tenant_id))
    }
}

#[async_trait]
impl Creatable for InAppMessage {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            tenant_id: Uuid::nil(),
            subject: String::new(),
            body: String::new(),
            is_active: true,
            audit: Audit::default(),
        }
    }

    async fn after_create(&self, effects: &Effects<'_>) -> Result<(), ServiceError> {
        if !self.is_active {
            return Ok(());
        }
        effects
            .notifier
            .send_to_group(&tenant_group(self.tenant_id), &self.subject)
            .await?;
        Ok(())
    }
}

impl Deletable for InAppMessage {}
