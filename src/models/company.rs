//! Company model and company id sanitization.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Registered company. Created once by an admin and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Sanitized id, primary key of the companies table
    pub company_id: String,
    /// Display name exactly as the admin typed it
    pub company_name: String,
    /// ISO-8601 creation time
    pub created_at: String,
}

impl Company {
    /// Build a new company record from a raw display name.
    ///
    /// Returns `None` when the name sanitizes to an empty id.
    pub fn new(company_name: &str) -> Option<Self> {
        let company_id = sanitize_company_id(company_name);
        if company_id.is_empty() {
            return None;
        }

        Some(Self {
            company_id,
            company_name: company_name.to_string(),
            created_at: iso_timestamp(),
        })
    }
}

/// Derive a company id from a display name.
///
/// Every character outside `[a-zA-Z0-9-]` is dropped and the rest is
/// lowercased. The same function is used for company creation, uploads and
/// file listings so one display name always maps to one key.
pub fn sanitize_company_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Current time as an ISO-8601 string with millisecond precision.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
