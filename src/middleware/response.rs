use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::outcome::{ErrorCode, Outcome};

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self { data, status_code: None }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self { data, status_code: Some(status_code) }
    }
}

fn serialize_or_500<T: Serialize>(data: &T) -> Result<Value, Response> {
    serde_json::to_value(data).map_err(|e| {
        tracing::error!("Failed to serialize response data: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Failed to serialize response data"
            })),
        )
            .into_response()
    })
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);
        match serialize_or_500(&self.data) {
            Ok(data) => (status, Json(json!({ "success": true, "data": data }))).into_response(),
            Err(response) => response,
        }
    }
}

fn failure(status: StatusCode, errors: &[ErrorCode]) -> Response {
    (status, Json(json!({ "success": false, "errors": errors }))).into_response()
}

/// Transport mapping for facade outcomes.
///
/// `Created` answers 201 with a `Location` header pointing at
/// `{location_base}/{id}` when a base is given.
pub struct OutcomeResponse<T> {
    outcome: Outcome<T>,
    location_base: Option<String>,
}

impl<T> OutcomeResponse<T> {
    pub fn new(outcome: Outcome<T>) -> Self {
        Self { outcome, location_base: None }
    }

    pub fn at(outcome: Outcome<T>, location_base: impl Into<String>) -> Self {
        Self { outcome, location_base: Some(location_base.into()) }
    }
}

impl<T: Serialize> IntoResponse for OutcomeResponse<T> {
    fn into_response(self) -> Response {
        match self.outcome {
            Outcome::Ok(payload) => ApiResponse::success(payload).into_response(),
            Outcome::Created { payload, id } => {
                let mut response = ApiResponse::with_status(payload, StatusCode::CREATED).into_response();
                if let Some(base) = self.location_base {
                    if let Ok(value) = HeaderValue::from_str(&format!("{}/{}", base.trim_end_matches('/'), id)) {
                        response.headers_mut().insert(header::LOCATION, value);
                    }
                }
                response
            }
            Outcome::NoContent => StatusCode::NO_CONTENT.into_response(),
            Outcome::BadRequest(errors) => failure(StatusCode::BAD_REQUEST, &errors),
            Outcome::NotFound => failure(StatusCode::NOT_FOUND, &[]),
            Outcome::Unauthorized(errors) => failure(StatusCode::UNAUTHORIZED, &errors),
        }
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        OutcomeResponse::new(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn status_mapping() {
        let cases: Vec<(Outcome<u8>, StatusCode)> = vec![
            (Outcome::ok(1), StatusCode::OK),
            (Outcome::created(1, Uuid::nil()), StatusCode::CREATED),
            (Outcome::no_content(), StatusCode::NO_CONTENT),
            (Outcome::bad_request(vec![ErrorCode::required("name")]), StatusCode::BAD_REQUEST),
            (Outcome::not_found(), StatusCode::NOT_FOUND),
            (Outcome::unauthorized(vec![ErrorCode::missing_user_id()]), StatusCode::UNAUTHORIZED),
        ];
        for (outcome, status) in cases {
            assert_eq!(outcome.into_response().status(), status);
        }
    }

    #[test]
    fn created_sets_location_header() {
        let id = Uuid::new_v4();
        let response = OutcomeResponse::at(Outcome::created("x", id), "/api/dashboards").into_response();
        let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, format!("/api/dashboards/{}", id));
    }
}
