use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, Repository};
use crate::delta::Patch;
use crate::entities::{Audit, Creatable, Deletable, Entity, Fetchable, Location, Patchable, TenantScope};
use crate::observer::{ForeignKey, Required, RulePipeline};

/// Operator log line attached to a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLogEntry {
    pub id: Uuid,
    pub location_id: Uuid,
    pub log_date: DateTime<Utc>,
    pub comment: String,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationLogEntryDelta {
    pub id: Patch<Uuid>,
    pub location_id: Patch<Uuid>,
    pub log_date: Patch<DateTime<Utc>>,
    pub comment: Patch<String>,
}

impl Entity for LocationLogEntry {
    const TABLE: &'static str = "location_log_entries";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.location_log_entries
    }
}

impl Fetchable for LocationLogEntry {
    const SET: &'static str = "locationlogentries";

    fn scope(&self) -> TenantScope {
        TenantScope::Location(self.location_id)
    }
}

impl Patchable for LocationLogEntry {
    type Delta = LocationLogEntryDelta;

    fn delta_id(delta: &Self::Delta) -> &Patch<Uuid> {
        &delta.id
    }

    fn delta_is_empty(delta: &Self::Delta) -> bool {
        delta.id.is_absent() && delta.location_id.is_absent() && delta.log_date.is_absent() && delta.comment.is_absent()
    }

    fn apply(&mut self, delta: &Self::Delta) {
        delta.location_id.apply_to(&mut self.location_id);
        delta.log_date.apply_to(&mut self.log_date);
        delta.comment.apply_to(&mut self.comment);
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn rules() -> RulePipeline<Self> {
        RulePipeline::new()
            .with(Required::<LocationLogEntry>::new("locationId", |e| !e.location_id.is_nil()))
            .with(Required::<LocationLogEntry>::new("comment", |e| !e.comment.trim().is_empty()))
            .with(ForeignKey::<LocationLogEntry, Location>::new("locationId", |e| Some(e.location_id)))
    }
}

#[async_trait]
impl Creatable for LocationLogEntry {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            location_id: Uuid::nil(),
            log_date: Utc::now(),
            comment: String::new(),
            audit: Audit::default(),
        }
    }
}

impl Deletable for LocationLogEntry {}
