use thiserror::Error;

use crate::database::DatabaseError;
use crate::storage::StorageError;

/// Infrastructure failures. Business rule violations never end up here;
/// they travel as `Outcome::BadRequest` instead.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Storage(StorageError::Serialization(err))
    }
}
