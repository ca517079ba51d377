//! Domain models for the logistics intake server.

pub mod company;
pub mod upload;
pub mod user;

// Re-export commonly used types
pub use company::{Company, iso_timestamp, sanitize_company_id};
pub use upload::{
    FileEntry, FileListResponse, PENDING_STATUS, UPLOAD_RECORD_TYPE, UploadRecord, UploadedFile,
};
pub use user::{Principal, SessionUser, UserInfo};
