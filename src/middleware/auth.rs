use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{decode_token, Principal};
use crate::handlers::AppState;

/// Decode a bearer token into a `Principal` request extension.
///
/// Never rejects: a missing or invalid token just leaves the request without
/// a principal, and the facades answer with a structured `Unauthorized`.
pub async fn principal_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_jwt_from_headers(&headers) {
        Ok(token) => match decode_token(&token, &state.config.security) {
            Ok(claims) => {
                request.extensions_mut().insert(Principal { claims });
            }
            Err(e) => tracing::debug!("Ignoring bearer token: {}", e),
        },
        Err(reason) => tracing::debug!("No principal: {}", reason),
    }

    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}
