use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use super::{parse_route_id, principal};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::outcome::{ErrorCode, Outcome};
use crate::services::{ConfigurationKind, ExportForm, StoredFile, UploadForm, UploadedFile};

/// Collect the multipart fields; unknown fields are skipped
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::payload_too_large(format!("Could not read {}: {}", file_name, e)))?;
                form.files.push(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "transactionType" | "tenantId" | "operationId" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Field {} is not text: {}", name, e)))?;
                match name.as_str() {
                    "transactionType" => form.transaction_type = Some(value),
                    "tenantId" => form.tenant_id = Some(value),
                    _ => form.operation_id = Some(value),
                }
            }
            other => tracing::debug!("Skipping multipart field {}", other),
        }
    }

    Ok(form)
}

async fn upload(
    kind: ConfigurationKind,
    state: AppState,
    extension: Option<Extension<Principal>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;
    let outcome = state.uploads.upload(kind, form, principal(&extension)).await?;
    Ok(outcome.into_response())
}

/// POST /api/operationconfigurations/upload
pub async fn upload_operation_configuration(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    upload(ConfigurationKind::OperationConfiguration, state, extension, multipart).await
}

/// POST /api/plantconfigurations/upload
pub async fn upload_plant_configuration(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    upload(ConfigurationKind::PlantConfiguration, state, extension, multipart).await
}

async fn export(
    kind: ConfigurationKind,
    state: AppState,
    extension: Option<Extension<Principal>>,
    body: Result<Json<ExportForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let form = match body {
        Ok(Json(form)) => form,
        Err(rejection) => {
            tracing::debug!("Rejected export body: {}", rejection.body_text());
            return Ok(Outcome::<()>::bad_request(vec![ErrorCode::entity_format_invalid()]).into_response());
        }
    };
    let outcome = state.uploads.request_export(kind, form, principal(&extension)).await?;
    Ok(outcome.into_response())
}

/// POST /api/operationconfigurations/export
pub async fn export_operation_configuration(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    body: Result<Json<ExportForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    export(ConfigurationKind::OperationConfiguration, state, extension, body).await
}

/// POST /api/plantconfigurations/export
pub async fn export_plant_configuration(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    body: Result<Json<ExportForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    export(ConfigurationKind::PlantConfiguration, state, extension, body).await
}

/// GET /api/transactions/:id
pub async fn transaction_get(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = match parse_route_id(&id) {
        Some(id) => state.uploads.transaction(principal(&extension), id).await?,
        None => Outcome::not_found(),
    };
    Ok(outcome.into_response())
}

/// GET /api/transactions/:id/file - the stored bytes as uploaded
pub async fn transaction_file(
    State(state): State<AppState>,
    extension: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(id) = parse_route_id(&id) else {
        return Ok(Outcome::<()>::not_found().into_response());
    };
    match state.uploads.download(principal(&extension), id).await? {
        Outcome::Ok(file) => Ok(file_response(file)),
        other => Ok(other.map(|_| ()).into_response()),
    }
}

fn file_response(file: StoredFile) -> Response {
    let content_type = file
        .record
        .content_type
        .as_deref()
        .and_then(|c| HeaderValue::from_str(c).ok())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    let mut response = (StatusCode::OK, file.bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    let disposition = format!("attachment; filename=\"{}\"", file.record.file_name.replace('"', ""));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
