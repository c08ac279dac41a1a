// Demo fixture loaded by `ffco serve --memory` and by the test suites

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::database::{Database, DatabaseError};
use crate::entities::{
    Audit, ChemicalFormType, Dashboard, DashboardOption, LimitType, Location, Parameter, ParameterType,
    ProductOfferingTenantLocation, Tenant, UnitType, UnitTypeGroup, UserTenant,
};

/// Ids of the seeded rows.
///
/// `user` belongs to tenant A only and `outsider` to tenant B only. Tenant A
/// reaches `site_a` and its child `line_a`; tenant B reaches `site_b`.
#[derive(Debug, Clone)]
pub struct DemoData {
    pub user: Uuid,
    pub outsider: Uuid,
    pub tenant_a: Uuid,
    pub tenant_b: Uuid,
    pub product_offering: Uuid,
    pub site_a: Uuid,
    pub line_a: Uuid,
    pub site_b: Uuid,
    pub unit_type_group: Uuid,
    pub unit_type: Uuid,
    pub parameter_type: Uuid,
    pub limit_type: Uuid,
    pub limit_type_low: Uuid,
    pub parameter_a: Uuid,
    pub dashboard_option_a: Uuid,
    pub dashboard_a: Uuid,
}

fn seeded_audit() -> Audit {
    let mut audit = Audit::default();
    audit.stamp_created(Uuid::nil(), Utc::now());
    audit
}

fn location(name: &str, parent_id: Option<Uuid>, location_type: &str) -> Location {
    Location {
        id: Uuid::new_v4(),
        name: name.to_string(),
        parent_id,
        location_type: Some(location_type.to_string()),
        is_active: true,
        audit: seeded_audit(),
    }
}

pub async fn seed(db: &Database) -> Result<DemoData, DatabaseError> {
    let tenant_a = Tenant { id: Uuid::new_v4(), name: "Northwind Water".to_string() };
    let tenant_b = Tenant { id: Uuid::new_v4(), name: "Contoso Power".to_string() };
    db.tenants.insert(&tenant_a).await?;
    db.tenants.insert(&tenant_b).await?;

    let user = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    db.user_tenants.insert(&UserTenant::new(user, tenant_a.id)).await?;
    db.user_tenants.insert(&UserTenant::new(outsider, tenant_b.id)).await?;

    let site_a = location("Riverside Plant", None, "site");
    let line_a = location("Cooling Tower 1", Some(site_a.id), "line");
    let site_b = location("Harbor Plant", None, "site");
    for row in [&site_a, &line_a, &site_b] {
        db.locations.insert(row).await?;
    }

    let product_offering = Uuid::new_v4();
    for (tenant_id, location_id) in [(tenant_a.id, site_a.id), (tenant_a.id, line_a.id), (tenant_b.id, site_b.id)] {
        db.tenant_locations
            .insert(&ProductOfferingTenantLocation::new(product_offering, tenant_id, location_id))
            .await?;
    }

    let group = UnitTypeGroup { id: Uuid::new_v4(), name: "Conductivity".to_string() };
    let unit = UnitType {
        id: Uuid::new_v4(),
        name: "Microsiemens per centimeter".to_string(),
        symbol: "µS/cm".to_string(),
        unit_type_group_id: group.id,
    };
    let parameter_type = ParameterType { id: Uuid::new_v4(), name: "Conductivity".to_string() };
    db.unit_type_groups.insert(&group).await?;
    db.unit_types.insert(&unit).await?;
    db.parameter_types.insert(&parameter_type).await?;
    db.chemical_form_types
        .insert(&ChemicalFormType {
            id: Uuid::new_v4(),
            name: "Phosphate".to_string(),
            formula: Some("PO4".to_string()),
        })
        .await?;

    let limit_type = LimitType {
        id: Uuid::new_v4(),
        i18n_key_name: "limit.high".to_string(),
        name: "High".to_string(),
        audit: seeded_audit(),
    };
    db.limit_types.insert(&limit_type).await?;
    let limit_type_low = LimitType {
        id: Uuid::new_v4(),
        i18n_key_name: "limit.low".to_string(),
        name: "Low".to_string(),
        audit: seeded_audit(),
    };
    db.limit_types.insert(&limit_type_low).await?;

    let parameter = Parameter {
        id: Uuid::new_v4(),
        location_id: line_a.id,
        parameter_type_id: parameter_type.id,
        unit_type_id: unit.id,
        limit_type_id: Some(limit_type.id),
        name: "Tower conductivity".to_string(),
        audit: seeded_audit(),
    };
    db.parameters.insert(&parameter).await?;

    let option = DashboardOption {
        id: Uuid::new_v4(),
        tenant_id: tenant_a.id,
        options: json!({"theme": "light", "refreshSeconds": 60}),
        audit: seeded_audit(),
    };
    db.dashboard_options.insert(&option).await?;

    let dashboard = Dashboard {
        id: Uuid::new_v4(),
        tenant_id: tenant_a.id,
        dashboard_option_id: Some(option.id),
        name: "Water quality".to_string(),
        audit: seeded_audit(),
    };
    db.dashboards.insert(&dashboard).await?;

    info!("Seeded demo data: tenants {} and {}", tenant_a.id, tenant_b.id);

    Ok(DemoData {
        user,
        outsider,
        tenant_a: tenant_a.id,
        tenant_b: tenant_b.id,
        product_offering,
        site_a: site_a.id,
        line_a: line_a.id,
        site_b: site_b.id,
        unit_type_group: group.id,
        unit_type: unit.id,
        parameter_type: parameter_type.id,
        limit_type: limit_type.id,
        limit_type_low: limit_type_low.id,
        parameter_a: parameter.id,
        dashboard_option_a: option.id,
        dashboard_a: dashboard.id,
    })
}
