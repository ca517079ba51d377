//! Upload intake and listings.

use tracing::{error, info, warn};
use uuid::Uuid;

use super::storage::{BlobStore, resolve_content_type};
use crate::db::MetadataStore;
use crate::error::{AppError, AppResult};
use crate::models::upload::{company_prefix, join_files, most_recent, upload_key};
use crate::models::{
    FileEntry, PENDING_STATUS, UPLOAD_RECORD_TYPE, UploadRecord, UploadedFile, iso_timestamp,
    sanitize_company_id,
};

/// Number of uploads shown on the admin dashboard.
pub const RECENT_UPLOADS_LIMIT: usize = 10;

/// A parsed upload form, before validation.
#[derive(Debug, Default)]
pub struct NewUpload {
    /// Raw `company` form field
    pub company: Option<String>,
    pub file: Option<UploadedFile>,
    /// Email of the signed-in client
    pub uploaded_by: String,
}

/// Identifiers of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub company_id: String,
    pub file_id: String,
}

/// Most recent uploads across all companies, newest first.
///
/// Reads a single scan page, so this is "recent among the first page".
pub async fn recent_uploads(store: &dyn MetadataStore) -> AppResult<Vec<UploadRecord>> {
    let records = store
        .scan_uploads(RECENT_UPLOADS_LIMIT)
        .await
        .inspect_err(|e| error!("Failed to list uploads: {}", e))?;
    Ok(most_recent(records, RECENT_UPLOADS_LIMIT))
}

/// Objects stored for a company, joined with their metadata records.
pub async fn company_files(
    metadata: &dyn MetadataStore,
    blobs: &dyn BlobStore,
    company: &str,
) -> AppResult<Vec<FileEntry>> {
    let company_id = sanitize_company_id(company);

    let keys = blobs
        .list_keys(&company_prefix(&company_id))
        .await
        .inspect_err(|e| error!("Failed to list files for '{}': {}", company_id, e))?;
    let records = metadata
        .scan_uploads_for_company(&company_id)
        .await
        .inspect_err(|e| error!("Failed to load records for '{}': {}", company_id, e))?;

    Ok(join_files(&keys, &records))
}

/// Validate an upload, store its bytes, then write its metadata record.
///
/// Validation order: company given, company exists, file attached. A
/// metadata failure after the object write leaves the object in place.
pub async fn upload_file(
    metadata: &dyn MetadataStore,
    blobs: &dyn BlobStore,
    upload: NewUpload,
) -> AppResult<UploadReceipt> {
    let company = upload
        .company
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Please select a company".to_string()))?;

    let company_id = sanitize_company_id(company);
    let exists = if company_id.is_empty() {
        false
    } else {
        metadata
            .get_company(&company_id)
            .await
            .inspect_err(|e| error!("Failed to look up company '{}': {}", company_id, e))?
            .is_some()
    };
    if !exists {
        return Err(AppError::Validation(
            "Selected company does not exist".to_string(),
        ));
    }

    let file = upload
        .file
        .ok_or_else(|| AppError::Validation("Please select an Excel file".to_string()))?;

    let file_id = Uuid::new_v4();
    let key = upload_key(&company_id, &file_id, &file.file_name);
    let content_type = resolve_content_type(file.content_type.as_deref(), &file.file_name);
    let size = file.bytes.len();

    blobs
        .put_object(&key, file.bytes, &content_type)
        .await
        .inspect_err(|e| error!("Failed to store object '{}': {}", key, e))?;

    let record = UploadRecord {
        file_id: file_id.to_string(),
        record_type: UPLOAD_RECORD_TYPE.to_string(),
        timestamp: iso_timestamp(),
        company_id: company_id.clone(),
        s3_key: key.clone(),
        data: file.file_name,
        uploaded_by: upload.uploaded_by,
        status: PENDING_STATUS.to_string(),
    };

    if let Err(e) = metadata.put_upload(&record).await {
        warn!("Object '{}' stored without a metadata record", key);
        error!("Failed to record upload {}: {}", record.file_id, e);
        return Err(e);
    }

    info!(
        "File uploaded: company={}, file_id={}, size={} bytes, by={}",
        company_id, record.file_id, size, record.uploaded_by
    );

    Ok(UploadReceipt {
        company_id,
        file_id: record.file_id,
    })
}
