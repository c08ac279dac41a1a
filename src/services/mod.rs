pub mod entity;
pub mod error;
pub mod upload;

pub use entity::EntityService;
pub use error::ServiceError;
pub use upload::{
    ConfigurationKind, ExportAck, ExportForm, ExportRequest, ProcessingMessage, StoredFile, TransactionRecord,
    UploadAck, UploadForm, UploadService, UploadedFile,
};
