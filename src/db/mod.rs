//! Metadata store: companies and upload records.

pub mod dynamo;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Company, UploadRecord};

pub use dynamo::DynamoMetadataStore;

/// Document store holding the Companies table and the uploads table.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// First page of a scan over the Companies table.
    async fn scan_companies(&self) -> AppResult<Vec<Company>>;

    async fn get_company(&self, company_id: &str) -> AppResult<Option<Company>>;

    /// Insert a company unless one with the same id exists.
    ///
    /// Fails with [`AppError::Conflict`](crate::error::AppError::Conflict)
    /// when the id is taken.
    async fn create_company(&self, company: &Company) -> AppResult<()>;

    /// Upload records (`type = "upload"`) from a single scan page evaluating
    /// at most `limit` items. Order is unspecified.
    async fn scan_uploads(&self, limit: usize) -> AppResult<Vec<UploadRecord>>;

    /// All upload records for one company.
    async fn scan_uploads_for_company(&self, company_id: &str) -> AppResult<Vec<UploadRecord>>;

    async fn put_upload(&self, record: &UploadRecord) -> AppResult<()>;
}
