// Read-only reference data. These types only implement `Fetchable`; the API
// exposes no create, patch or delete for them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, Repository};
use crate::entities::{Entity, Fetchable, TenantScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitType {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
    pub unit_type_group_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTypeGroup {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemicalFormType {
    pub id: Uuid,
    pub name: String,
    pub formula: Option<String>,
}

impl Entity for UnitType {
    const TABLE: &'static str = "unit_types";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.unit_types
    }
}

impl Fetchable for UnitType {
    const SET: &'static str = "unittypes";

    fn scope(&self) -> TenantScope {
        TenantScope::Global
    }
}

impl Entity for UnitTypeGroup {
    const TABLE: &'static str = "unit_type_groups";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.unit_type_groups
    }
}

impl Fetchable for UnitTypeGroup {
    const SET: &'static str = "unittypegroups";

    fn scope(&self) -> TenantScope {
        TenantScope::Global
    }
}

impl Entity for ParameterType {
    const TABLE: &'static str = "parameter_types";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.parameter_types
    }
}

impl Fetchable for ParameterType {
    const SET: &'static str = "parametertypes";

    fn scope(&self) -> TenantScope {
        TenantScope::Global
    }
}

impl Entity for ChemicalFormType {
    const TABLE: &'static str = "chemical_form_types";

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(db: &Database) -> &Arc<dyn Repository<Self>> {
        &db.chemical_form_types
    }
}

impl Fetchable for ChemicalFormType {
    const SET: &'static str = "chemicalformtypes";

    fn scope(&self) -> TenantScope {
        TenantScope::Global
    }
}
