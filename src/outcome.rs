//! Tagged results returned by every facade operation.
//!
//! Facades never speak HTTP. They hand back an [`Outcome`] and the transport
//! layer (`middleware::response`) turns it into a status code and body.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable machine-readable error codes
pub mod codes {
    pub const REQUIRED: &str = "required";
    pub const FORMAT_INVALID: &str = "format-invalid";
    pub const FK_MISSING: &str = "fk-missing";
    pub const TENANT_MISMATCH: &str = "tenant-mismatch";
    pub const DUPLICATE: &str = "duplicate";
    pub const IMMUTABLE_FIELD: &str = "immutable-field";
    pub const CIRCULAR_REFERENCE: &str = "circular-reference";
    pub const ENTITY_FORMAT_INVALID: &str = "entity-format-invalid";
    pub const COULD_NOT_DELETE: &str = "could-not-delete";
    pub const TOKEN_INVALID_MISSING_USER_ID: &str = "token-invalid-missing-user-id";
}

/// A structured error entry: `{code, description, property?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub property: Option<String>,
}

impl ErrorCode {
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            description: description.into(),
            property: None,
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn required(property: &str) -> Self {
        Self::new(codes::REQUIRED, format!("{} is required", property)).with_property(property)
    }

    pub fn format_invalid(property: &str, description: impl Into<String>) -> Self {
        Self::new(codes::FORMAT_INVALID, description).with_property(property)
    }

    pub fn fk_missing(property: &str, id: Uuid) -> Self {
        Self::new(codes::FK_MISSING, format!("{} {} does not exist", property, id)).with_property(property)
    }

    pub fn tenant_mismatch(property: &str, description: impl Into<String>) -> Self {
        Self::new(codes::TENANT_MISMATCH, description).with_property(property)
    }

    pub fn no_tenant_membership() -> Self {
        Self::new(codes::TENANT_MISMATCH, "caller is not a member of any tenant")
    }

    pub fn duplicate(property: &str, value: &str) -> Self {
        Self::new(codes::DUPLICATE, format!("{} '{}' is already in use", property, value)).with_property(property)
    }

    pub fn id_update_not_allowed() -> Self {
        Self::new(codes::IMMUTABLE_FIELD, "id update not allowed").with_property("id")
    }

    pub fn id_assigned_by_server() -> Self {
        Self::new(codes::IMMUTABLE_FIELD, "id is assigned by the server").with_property("id")
    }

    pub fn circular_reference(property: &str) -> Self {
        Self::new(codes::CIRCULAR_REFERENCE, format!("{} would create a circular reference", property))
            .with_property(property)
    }

    pub fn entity_format_invalid() -> Self {
        Self::new(codes::ENTITY_FORMAT_INVALID, "entity format invalid")
    }

    pub fn could_not_delete(description: impl Into<String>) -> Self {
        Self::new(codes::COULD_NOT_DELETE, description)
    }

    pub fn missing_user_id() -> Self {
        Self::new(codes::TOKEN_INVALID_MISSING_USER_ID, "token invalid - missing UserId")
    }
}

/// Accumulated validation errors, in the order the rules reported them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ErrorCode>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ErrorCode) {
        self.errors.push(error);
    }

    pub fn is_invalid(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ErrorCode] {
        &self.errors
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn into_errors(self) -> Vec<ErrorCode> {
        self.errors
    }
}

impl From<ErrorCode> for ValidationResult {
    fn from(error: ErrorCode) -> Self {
        Self { errors: vec![error] }
    }
}

/// Command or query outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Created { payload: T, id: Uuid },
    NoContent,
    BadRequest(Vec<ErrorCode>),
    NotFound,
    Unauthorized(Vec<ErrorCode>),
}

pub type CommandResult<T> = Outcome<T>;
pub type QueryResult<T> = Outcome<T>;

impl<T> Outcome<T> {
    pub fn ok(payload: T) -> Self {
        Outcome::Ok(payload)
    }

    pub fn created(payload: T, id: Uuid) -> Self {
        Outcome::Created { payload, id }
    }

    pub fn no_content() -> Self {
        Outcome::NoContent
    }

    pub fn bad_request(errors: Vec<ErrorCode>) -> Self {
        Outcome::BadRequest(errors)
    }

    pub fn not_found() -> Self {
        Outcome::NotFound
    }

    pub fn unauthorized(errors: Vec<ErrorCode>) -> Self {
        Outcome::Unauthorized(errors)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Ok(_) | Outcome::Created { .. } | Outcome::NoContent)
    }

    /// Errors carried by a failed outcome (empty for success and NotFound)
    pub fn errors(&self) -> &[ErrorCode] {
        match self {
            Outcome::BadRequest(errors) | Outcome::Unauthorized(errors) => errors,
            _ => &[],
        }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Outcome::Ok(payload) | Outcome::Created { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Outcome::Ok(payload) | Outcome::Created { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(payload) => Outcome::Ok(f(payload)),
            Outcome::Created { payload, id } => Outcome::Created { payload: f(payload), id },
            Outcome::NoContent => Outcome::NoContent,
            Outcome::BadRequest(errors) => Outcome::BadRequest(errors),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Unauthorized(errors) => Outcome::Unauthorized(errors),
        }
    }
}
