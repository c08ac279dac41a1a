// Tenant membership and per-request visibility

pub mod access;
pub mod membership;

pub use access::{visible_entities, visible_entity, AccessScope};
pub use membership::{location_tenants, locations_for_tenants, tenants_for_user};
