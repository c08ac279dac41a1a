use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{resolve_user, Principal};
use crate::config::StorageConfig;
use crate::database::Database;
use crate::entities::Location;
use crate::outcome::{CommandResult, ErrorCode, Outcome, QueryResult, ValidationResult};
use crate::services::ServiceError;
use crate::storage::{BlobHandle, Storage};
use crate::tenancy::{location_tenants, visible_entity, AccessScope};

/// Which configuration pipeline an upload or export belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigurationKind {
    OperationConfiguration,
    PlantConfiguration,
}

impl ConfigurationKind {
    /// Route segment under `/api`
    pub fn set(&self) -> &'static str {
        match self {
            ConfigurationKind::OperationConfiguration => "operationconfigurations",
            ConfigurationKind::PlantConfiguration => "plantconfigurations",
        }
    }

    pub fn upload_queue<'a>(&self, config: &'a StorageConfig) -> &'a str {
        match self {
            ConfigurationKind::OperationConfiguration => &config.operation_config_queue,
            ConfigurationKind::PlantConfiguration => &config.plant_config_queue,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Multipart fields as received; ids stay raw so bad values become validation errors
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub transaction_type: Option<String>,
    pub tenant_id: Option<String>,
    pub operation_id: Option<String>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportForm {
    pub tenant_id: Option<String>,
    pub operation_id: Option<String>,
}

/// Document written for every uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub kind: ConfigurationKind,
    pub transaction_type: String,
    pub tenant_id: Uuid,
    pub operation_id: Option<Uuid>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub blob: BlobHandle,
    pub uploaded_by_id: Uuid,
    pub uploaded_on: DateTime<Utc>,
}

/// Queue message telling the processing worker where the upload lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMessage {
    pub transaction_id: Uuid,
    pub blob_name: String,
    pub container: String,
    pub kind: ConfigurationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub request_id: Uuid,
    pub kind: ConfigurationKind,
    pub tenant_id: Uuid,
    pub operation_id: Uuid,
    pub requested_by_id: Uuid,
    pub requested_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAck {
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAck {
    pub request_id: Uuid,
    pub queue: String,
}

/// A stored upload fetched back for download
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub record: TransactionRecord,
    pub bytes: Vec<u8>,
}

/// Keep only the final path component and a conservative character set
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

fn parse_id(property: &str, raw: &str, result: &mut ValidationResult) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            result.push(ErrorCode::format_invalid(property, format!("{} '{}' is not a valid id", property, raw)));
            None
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Upload-to-queue pipeline: validate, store blob, record, enqueue
#[derive(Clone)]
pub struct UploadService {
    db: Database,
    storage: Storage,
    config: StorageConfig,
}

impl UploadService {
    pub fn new(db: Database, storage: Storage, config: StorageConfig) -> Self {
        Self { db, storage, config }
    }

    async fn scope_for(&self, principal: Option<&Principal>) -> Result<Option<AccessScope>, ServiceError> {
        match resolve_user(principal) {
            Some(user_id) => Ok(Some(AccessScope::resolve(&self.db, user_id).await?)),
            None => Ok(None),
        }
    }

    /// Tenant id present, well formed and one of the caller's tenants
    fn check_tenant(&self, raw: &Option<String>, scope: &AccessScope, result: &mut ValidationResult) -> Option<Uuid> {
        let Some(raw) = non_blank(raw) else {
            result.push(ErrorCode::required("tenantId"));
            return None;
        };
        let tenant_id = parse_id("tenantId", raw, result)?;
        if !scope.belongs_to(tenant_id) {
            result.push(ErrorCode::tenant_mismatch(
                "tenantId",
                format!("caller is not a member of tenant {}", tenant_id),
            ));
            return None;
        }
        Some(tenant_id)
    }

    /// Operation (location) id, when given, names a location the caller can see
    async fn check_operation(
        &self,
        raw: &Option<String>,
        scope: &AccessScope,
        result: &mut ValidationResult,
    ) -> Result<Option<Uuid>, ServiceError> {
        let Some(raw) = non_blank(raw) else {
            return Ok(None);
        };
        let Some(operation_id) = parse_id("operationId", raw, result) else {
            return Ok(None);
        };
        if visible_entity::<Location>(&self.db, scope, operation_id).await?.is_none() {
            result.push(ErrorCode::fk_missing("operationId", operation_id));
            return Ok(None);
        }
        Ok(Some(operation_id))
    }

    pub async fn upload(
        &self,
        kind: ConfigurationKind,
        form: UploadForm,
        principal: Option<&Principal>,
    ) -> Result<CommandResult<UploadAck>, ServiceError> {
        let Some(scope) = self.scope_for(principal).await? else {
            return Ok(Outcome::unauthorized(vec![ErrorCode::missing_user_id()]));
        };

        let mut result = ValidationResult::new();
        let transaction_type = non_blank(&form.transaction_type).map(str::to_string);
        if transaction_type.is_none() {
            result.push(ErrorCode::required("transactionType"));
        }
        if form.files.is_empty() {
            result.push(ErrorCode::required("file"));
        }
        let tenant_id = self.check_tenant(&form.tenant_id, &scope, &mut result);
        let operation_id = self.check_operation(&form.operation_id, &scope, &mut result).await?;
        for file in &form.files {
            if file.bytes.is_empty() {
                result.push(ErrorCode::format_invalid("file", format!("{} is empty", file.file_name)));
            } else if file.bytes.len() > self.config.max_upload_bytes {
                result.push(ErrorCode::format_invalid(
                    "file",
                    format!("{} exceeds {} bytes", file.file_name, self.config.max_upload_bytes),
                ));
            }
        }

        let (Some(transaction_type), Some(tenant_id)) = (transaction_type, tenant_id) else {
            return Ok(Outcome::bad_request(result.into_errors()));
        };
        if result.is_invalid() {
            return Ok(Outcome::bad_request(result.into_errors()));
        }

        let queue = kind.upload_queue(&self.config);
        let mut transactions = Vec::with_capacity(form.files.len());
        for file in form.files {
            let blob_name = format!("{}/{}-{}", tenant_id, Uuid::new_v4(), sanitize_file_name(&file.file_name));
            let blob = self.storage.blobs.store(&blob_name, &file.bytes).await?;

            let mut record = TransactionRecord {
                id: None,
                kind,
                transaction_type: transaction_type.clone(),
                tenant_id,
                operation_id,
                file_name: file.file_name,
                content_type: file.content_type,
                blob,
                uploaded_by_id: scope.user_id,
                uploaded_on: Utc::now(),
            };

            // No compensation past this point: a failure leaves the blob orphaned
            let transaction_id = match self.record_and_enqueue(&record, queue).await {
                Ok(id) => id,
                Err(e) => {
                    warn!("Orphaned blob {} after upload failure: {}", record.blob.name, e);
                    return Err(e);
                }
            };
            record.id = Some(transaction_id);

            info!(
                "Queued {} transaction {} ({} bytes) for tenant {}",
                kind.set(),
                transaction_id,
                record.blob.size,
                tenant_id
            );
            transactions.push(record);
        }

        Ok(Outcome::ok(UploadAck { transactions }))
    }

    async fn record_and_enqueue(&self, record: &TransactionRecord, queue: &str) -> Result<Uuid, ServiceError> {
        let transaction_id = self
            .storage
            .documents
            .create_item(&self.config.transaction_collection, serde_json::to_value(record)?)
            .await?;

        let message = ProcessingMessage {
            transaction_id,
            blob_name: record.blob.name.clone(),
            container: self.config.blob_container.clone(),
            kind: record.kind,
        };
        self.storage.queue.enqueue(queue, &serde_json::to_string(&message)?).await?;
        Ok(transaction_id)
    }

    pub async fn request_export(
        &self,
        kind: ConfigurationKind,
        form: ExportForm,
        principal: Option<&Principal>,
    ) -> Result<CommandResult<ExportAck>, ServiceError> {
        let Some(scope) = self.scope_for(principal).await? else {
            return Ok(Outcome::unauthorized(vec![ErrorCode::missing_user_id()]));
        };

        let mut result = ValidationResult::new();
        let tenant_id = self.check_tenant(&form.tenant_id, &scope, &mut result);
        if non_blank(&form.operation_id).is_none() {
            result.push(ErrorCode::required("operationId"));
        }
        let operation_id = self.check_operation(&form.operation_id, &scope, &mut result).await?;

        if let (Some(tenant_id), Some(operation_id)) = (tenant_id, operation_id) {
            if !location_tenants(&self.db, operation_id).await?.contains(&tenant_id) {
                result.push(ErrorCode::tenant_mismatch(
                    "operationId",
                    format!("location {} is not linked to tenant {}", operation_id, tenant_id),
                ));
            }
        }

        let (Some(tenant_id), Some(operation_id)) = (tenant_id, operation_id) else {
            return Ok(Outcome::bad_request(result.into_errors()));
        };
        if result.is_invalid() {
            return Ok(Outcome::bad_request(result.into_errors()));
        }

        let request = ExportRequest {
            request_id: Uuid::new_v4(),
            kind,
            tenant_id,
            operation_id,
            requested_by_id: scope.user_id,
            requested_on: Utc::now(),
        };
        let queue = self.config.export_queue.clone();
        self.storage.queue.enqueue(&queue, &serde_json::to_string(&request)?).await?;

        info!("Queued {} export {} for location {}", kind.set(), request.request_id, operation_id);
        Ok(Outcome::ok(ExportAck { request_id: request.request_id, queue }))
    }

    /// Stored transaction metadata, only for the caller's tenants
    pub async fn transaction(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
    ) -> Result<QueryResult<TransactionRecord>, ServiceError> {
        let Some(scope) = self.scope_for(principal).await? else {
            return Ok(Outcome::unauthorized(vec![ErrorCode::missing_user_id()]));
        };

        let Some(item) = self.storage.documents.get_item(&self.config.transaction_collection, id).await? else {
            return Ok(Outcome::not_found());
        };
        let record: TransactionRecord = serde_json::from_value(item)?;
        if !scope.belongs_to(record.tenant_id) {
            return Ok(Outcome::not_found());
        }
        Ok(Outcome::ok(record))
    }

    pub async fn download(&self, principal: Option<&Principal>, id: Uuid) -> Result<QueryResult<StoredFile>, ServiceError> {
        let record = match self.transaction(principal, id).await? {
            Outcome::Ok(record) => record,
            Outcome::Unauthorized(errors) => return Ok(Outcome::unauthorized(errors)),
            _ => return Ok(Outcome::not_found()),
        };
        let bytes = self.storage.blobs.download(&record.blob.name).await?;
        Ok(Outcome::ok(StoredFile { record, bytes }))
    }
}
