//! Client upload page, file listing and multipart upload.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, get, post, web};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::warn;

use super::flash::{FlashQuery, redirect_with_message};
use super::views;
use crate::auth::{ClientSession, SessionContext};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::upload::normalize_file_name;
use crate::models::{FileListResponse, UploadedFile};
use crate::services::companies;
use crate::services::uploads::{self, NewUpload};
use crate::state::AppState;

/// Multipart field holding the company id.
pub const COMPANY_FIELD: &str = "company";

/// Multipart field holding the uploaded file.
pub const FILE_FIELD: &str = "excelFile";

pub const UPLOAD_TOO_LARGE: &str = "File exceeds maximum upload size";

/// Query of `GET /client/files`.
#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    pub company: Option<String>,
}

/// Company picker and upload form.
///
/// GET /client
#[get("/client")]
pub async fn upload_page(
    client: ClientSession,
    state: web::Data<AppState>,
    query: web::Query<FlashQuery>,
) -> HttpResponse {
    let page = match companies::list_companies(state.metadata.as_ref()).await {
        Ok(companies) => views::client_page(&client.user, query.message.as_deref(), &companies),
        Err(_) => {
            let message = query.message.as_deref().unwrap_or("Error fetching companies");
            views::client_page(&client.user, Some(message), &[])
        }
    };

    views::html(page)
}

/// Files stored for a company, as JSON.
///
/// Answers with JSON errors rather than redirects: 403 for anyone but a
/// client, 400 without a `company` parameter.
///
/// GET /client/files?company=...
#[get("/client/files")]
pub async fn list_files(
    session: SessionContext,
    state: web::Data<AppState>,
    query: web::Query<FilesQuery>,
) -> AppResult<HttpResponse> {
    if !session.principal().is_client() {
        return Err(AppError::AccessDenied);
    }

    let company = query
        .company
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Company parameter is required".to_string()))?;

    match uploads::company_files(state.metadata.as_ref(), state.blobs.as_ref(), company).await {
        Ok(files) => Ok(HttpResponse::Ok().json(FileListResponse { files })),
        Err(e) if e.is_store_failure() => Ok(HttpResponse::InternalServerError()
            .json(ErrorResponse::new("Error fetching files"))),
        Err(e) => Err(e),
    }
}

/// Receive a spreadsheet for a company.
///
/// POST /upload (multipart: `company`, `excelFile`)
#[post("/upload")]
pub async fn upload(
    client: ClientSession,
    state: web::Data<AppState>,
    payload: Multipart,
) -> HttpResponse {
    let (company, file) = match read_upload_form(payload, state.max_upload_size).await {
        Ok(form) => form,
        Err(AppError::Validation(msg)) => return redirect_with_message("/client", &msg),
        Err(e) => {
            warn!("Failed to read upload form: {}", e);
            return redirect_with_message("/client", "Error uploading file");
        }
    };

    let new_upload = NewUpload {
        company,
        file,
        uploaded_by: client.email,
    };

    match uploads::upload_file(state.metadata.as_ref(), state.blobs.as_ref(), new_upload).await {
        Ok(receipt) => redirect_with_message(
            "/client",
            &format!(
                "File uploaded successfully for {} with FileID {}",
                receipt.company_id, receipt.file_id
            ),
        ),
        Err(AppError::Validation(msg)) => redirect_with_message("/client", &msg),
        Err(_) => redirect_with_message("/client", "Error uploading file"),
    }
}

/// Read the `company` text field and the `excelFile` file field.
///
/// A file part with an empty file name counts as no file. Unknown fields
/// are drained and ignored.
async fn read_upload_form(
    mut payload: Multipart,
    max_upload_size: usize,
) -> AppResult<(Option<String>, Option<UploadedFile>)> {
    let mut company: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(String::from),
            ),
            None => (String::new(), None),
        };

        match name.as_str() {
            COMPANY_FIELD => {
                let bytes = read_field(&mut field, max_upload_size).await?;
                company = Some(String::from_utf8_lossy(&bytes).trim().to_string());
            }
            FILE_FIELD => {
                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                let bytes = read_field(&mut field, max_upload_size).await?;
                let file_name = filename.as_deref().map(normalize_file_name).unwrap_or_default();
                if !file_name.is_empty() {
                    file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {
                read_field(&mut field, max_upload_size).await?;
            }
        }
    }

    Ok((company, file))
}

/// Collect a field's bytes, failing once they exceed `limit`.
async fn read_field(field: &mut Field, limit: usize) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::Validation(UPLOAD_TOO_LARGE.to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Configure client routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_page).service(list_files).service(upload);
}
