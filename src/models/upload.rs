//! Upload records, uploaded file payloads and client file listings.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator value for upload items in the shared uploads table.
pub const UPLOAD_RECORD_TYPE: &str = "upload";

/// Status written for every new upload.
///
/// This server never changes it; a downstream processor moves records on.
/// The same constant is the fallback shown for objects that have no
/// metadata record yet.
pub const PENDING_STATUS: &str = "pending";

/// Metadata item written for every uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub file_id: String,
    /// Always [`UPLOAD_RECORD_TYPE`]
    #[serde(rename = "type")]
    pub record_type: String,
    /// ISO-8601 creation time
    pub timestamp: String,
    pub company_id: String,
    #[serde(rename = "S3Key")]
    pub s3_key: String,
    /// Original file name
    pub data: String,
    /// Email of the uploader
    pub uploaded_by: String,
    pub status: String,
}

impl UploadRecord {
    /// Parsed timestamp, if it is valid RFC 3339.
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

/// File received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Last path segment of the client-supplied file name
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One object in a company's storage prefix, joined with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub key: String,
    pub file_name: String,
    /// Whether a metadata record references this object
    #[serde(rename = "inDynamoDB")]
    pub recorded: bool,
    pub status: String,
}

/// Response body for the client file listing.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileEntry>,
}

/// Object key prefix for a company: `uploads/{company_id}/`.
pub fn company_prefix(company_id: &str) -> String {
    format!("uploads/{}/", company_id)
}

/// Object key for an upload: `uploads/{company_id}/{file_id}-{file_name}`.
pub fn upload_key(company_id: &str, file_id: &Uuid, file_name: &str) -> String {
    format!("{}{}-{}", company_prefix(company_id), file_id, file_name)
}

/// Portion of an object key after the last `/`.
pub fn file_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Reduce a client-supplied file name to its last path segment.
///
/// Some browsers send the full local path; backslashes count as separators.
pub fn normalize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim().to_string()
}

/// Join an object listing with metadata records by storage key.
///
/// Objects without a record are reported as not recorded, with the pending
/// status.
pub fn join_files(keys: &[String], records: &[UploadRecord]) -> Vec<FileEntry> {
    keys.iter()
        .map(|key| {
            let record = records.iter().find(|r| &r.s3_key == key);
            FileEntry {
                key: key.clone(),
                file_name: file_name_from_key(key).to_string(),
                recorded: record.is_some(),
                status: record
                    .map(|r| r.status.clone())
                    .unwrap_or_else(|| PENDING_STATUS.to_string()),
            }
        })
        .collect()
}

/// Sort records newest first and keep at most `limit`.
///
/// Records with an unparseable timestamp sort after all valid ones.
pub fn most_recent(mut records: Vec<UploadRecord>, limit: usize) -> Vec<UploadRecord> {
    records.sort_by(|a, b| b.parsed_timestamp().cmp(&a.parsed_timestamp()));
    records.truncate(limit);
    records
}
