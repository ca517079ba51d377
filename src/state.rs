//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::db::MetadataStore;
use crate::services::{BlobStore, IdentityGateway, RoleMapping};

/// Immutable service handles, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityGateway>,
    pub metadata: Arc<dyn MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub roles: RoleMapping,
    /// Maximum size of one uploaded file in bytes
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityGateway>,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        roles: RoleMapping,
        max_upload_size: usize,
    ) -> Self {
        Self {
            identity,
            metadata,
            blobs,
            roles,
            max_upload_size,
        }
    }
}
