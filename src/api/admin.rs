//! Admin dashboard and company management.

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use tracing::info;

use super::flash::{FlashQuery, redirect_with_message};
use super::views;
use crate::auth::AdminSession;
use crate::error::AppError;
use crate::services::{companies, uploads};
use crate::state::AppState;

/// Form body of `POST /admin/add-company`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCompanyForm {
    #[serde(default)]
    pub company_name: String,
}

/// Companies plus the ten most recent uploads.
///
/// A store failure still renders the page, empty, with `Error fetching data`.
///
/// GET /admin
#[get("/admin")]
pub async fn dashboard(
    admin: AdminSession,
    state: web::Data<AppState>,
    query: web::Query<FlashQuery>,
) -> HttpResponse {
    let loaded = async {
        let companies = companies::list_companies(state.metadata.as_ref()).await?;
        let recent = uploads::recent_uploads(state.metadata.as_ref()).await?;
        Ok::<_, AppError>((companies, recent))
    }
    .await;

    let page = match loaded {
        Ok((companies, recent)) => {
            views::admin_page(&admin.user, query.message.as_deref(), &companies, &recent)
        }
        Err(_) => {
            let message = query.message.as_deref().unwrap_or("Error fetching data");
            views::admin_page(&admin.user, Some(message), &[], &[])
        }
    };

    views::html(page)
}

/// Register a company and redirect back to the dashboard with the outcome.
///
/// POST /admin/add-company
#[post("/admin/add-company")]
pub async fn add_company(
    admin: AdminSession,
    state: web::Data<AppState>,
    form: web::Form<AddCompanyForm>,
) -> HttpResponse {
    let message = match companies::add_company(state.metadata.as_ref(), &form.company_name).await {
        Ok(company) => {
            info!("Company {} added by {}", company.company_id, admin.email);
            format!("Company {} added successfully", company.company_id)
        }
        Err(AppError::Validation(msg) | AppError::Conflict(msg)) => msg,
        Err(_) => "Error adding company".to_string(),
    };

    redirect_with_message("/admin", &message)
}

/// Configure admin routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard).service(add_company);
}
