pub mod entity;
pub mod upload;

use axum::Extension;
use uuid::Uuid;

use crate::auth::Principal;

/// Principal inserted by the middleware, if the bearer token decoded
pub(crate) fn principal(extension: &Option<Extension<Principal>>) -> Option<&Principal> {
    extension.as_ref().map(|Extension(p)| p)
}

/// Route ids that are not UUIDs can never match a row
pub(crate) fn parse_route_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}
