use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Extension,
};
use serde::de::DeserializeOwned;

use super::{parse_route_id, principal};
use crate::auth::Principal;
use crate::entities::{Creatable, Deletable, Fetchable, Patchable};
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::OutcomeResponse;
use crate::odata::ODataQuery;
use crate::outcome::{ErrorCode, Outcome};

/// Unparseable or `null` bodies both become "no delta"
fn parse_delta<D: DeserializeOwned>(body: &Bytes) -> Option<D> {
    match serde_json::from_slice::<Option<D>>(body) {
        Ok(delta) => delta,
        Err(e) => {
            tracing::debug!("Rejected request body: {}", e);
            None
        }
    }
}

fn collection<E: Fetchable>() -> String {
    format!("/api/{}", E::SET)
}

/// GET /api/:set - visible rows with $filter/$orderby/$top/$skip/$count
pub async fn list<E: Fetchable>(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    query: Result<Query<ODataQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            let error = ErrorCode::format_invalid("$query", rejection.body_text());
            return Ok(Outcome::<()>::bad_request(vec![error]).into_response());
        }
    };

    let outcome = state.entities.list::<E>(principal(&extension), &query).await?;
    Ok(outcome.into_response())
}

/// GET /api/:set/:id
pub async fn get<E: Fetchable>(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = match parse_route_id(&id) {
        Some(id) => state.entities.get::<E>(principal(&extension), id).await?,
        None => Outcome::not_found(),
    };
    Ok(outcome.into_response())
}

/// POST /api/:set - body is the entity's delta shape
pub async fn create<E: Creatable>(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let delta = parse_delta::<E::Delta>(&body);
    let outcome = state.entities.create::<E>(principal(&extension), delta).await?;
    Ok(OutcomeResponse::at(outcome, collection::<E>()).into_response())
}

/// PATCH /api/:set/:id - only fields present in the body change
pub async fn patch<E: Patchable>(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let delta = parse_delta::<E::Delta>(&body);
    let outcome = match parse_route_id(&id) {
        Some(id) => state.entities.patch::<E>(principal(&extension), id, delta).await?,
        None => Outcome::not_found(),
    };
    Ok(outcome.into_response())
}

/// DELETE /api/:set/:id
pub async fn delete<E: Deletable>(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = match parse_route_id(&id) {
        Some(id) => state.entities.delete::<E>(principal(&extension), id).await?,
        None => Outcome::not_found(),
    };
    Ok(outcome.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LocationDelta;

    #[test]
    fn null_and_garbage_bodies_are_not_deltas() {
        assert!(parse_delta::<LocationDelta>(&Bytes::from_static(b"null")).is_none());
        assert!(parse_delta::<LocationDelta>(&Bytes::from_static(b"{not json")).is_none());
        assert!(parse_delta::<LocationDelta>(&Bytes::new()).is_none());
        assert!(parse_delta::<LocationDelta>(&Bytes::from_static(b"{\"name\":\"Kiln\"}")).is_some());
    }
}
