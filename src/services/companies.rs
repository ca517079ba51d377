//! Company management.

use tracing::{error, info};

use crate::db::MetadataStore;
use crate::error::{AppError, AppResult};
use crate::models::Company;

/// All companies, sorted by display name for the pickers.
///
/// Only the first page of the underlying scan is read.
pub async fn list_companies(store: &dyn MetadataStore) -> AppResult<Vec<Company>> {
    let mut companies = store.scan_companies().await.inspect_err(|e| {
        error!("Failed to list companies: {}", e);
    })?;
    companies.sort_by_key(|c| c.company_name.to_lowercase());
    Ok(companies)
}

/// Register a company from the name an admin typed.
///
/// Fails with `Validation` for an empty name or one that sanitizes to an
/// empty id, `Conflict` when the id is taken, and `Database` otherwise.
pub async fn add_company(store: &dyn MetadataStore, company_name: &str) -> AppResult<Company> {
    if company_name.is_empty() {
        return Err(AppError::Validation(
            "Please provide a company name".to_string(),
        ));
    }

    let company = Company::new(company_name)
        .ok_or_else(|| AppError::Validation("Invalid company name".to_string()))?;

    match store.create_company(&company).await {
        Ok(()) => {
            info!(
                "Company added: id={}, name={:?}",
                company.company_id, company.company_name
            );
            Ok(company)
        }
        Err(AppError::Conflict(msg)) => {
            info!("Company '{}' already exists", company.company_id);
            Err(AppError::Conflict(msg))
        }
        Err(e) => {
            error!("Failed to add company '{}': {}", company.company_id, e);
            Err(e)
        }
    }
}
