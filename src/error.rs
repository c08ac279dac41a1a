// Transport errors for failures that never become an Outcome: malformed
// multipart bodies and infrastructure faults surfacing from the facades.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::services::ServiceError;
use crate::storage::StorageError;

const GENERIC_FAILURE: &str = "An error occurred while processing your request";

/// Client-facing error; the message never carries internal details
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable upper-snake code derived from the status, e.g. `SERVICE_UNAVAILABLE`
    pub fn error_code(&self) -> String {
        self.status()
            .canonical_reason()
            .unwrap_or("ERROR")
            .to_ascii_uppercase()
            .replace(' ', "_")
    }

    pub fn body(&self) -> Value {
        json!({
            "success": false,
            "error": self.to_string(),
            "error_code": self.error_code(),
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => ApiError::NotFound(what),
            DatabaseError::Conflict(what) => ApiError::Conflict(what),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::Unavailable("Database temporarily unavailable".to_string())
            }
            DatabaseError::Decode(e) => {
                tracing::error!("Stored row failed to decode: {}", e);
                ApiError::Internal(GENERIC_FAILURE.to_string())
            }
            DatabaseError::Sqlx(e) => {
                tracing::error!("SQLx error: {}", e);
                ApiError::Internal(GENERIC_FAILURE.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::NotFound(what),
            other => {
                tracing::error!("Storage error: {}", other);
                ApiError::Unavailable("Storage temporarily unavailable".to_string())
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => e.into(),
            ServiceError::Storage(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_details_are_hidden() {
        let err: ApiError = DatabaseError::ConfigMissing("DATABASE_URL").into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.to_string().contains("DATABASE_URL"));

        let err: ApiError = ServiceError::Storage(StorageError::Unavailable("queue uploads".into())).into();
        assert_eq!(err.error_code(), "SERVICE_UNAVAILABLE");
        assert!(!err.to_string().contains("uploads"));
    }

    #[test]
    fn body_uses_failure_envelope() {
        let body = ApiError::bad_request("missing file").body();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("missing file"));
        assert_eq!(body["error_code"], json!("BAD_REQUEST"));
    }
}
