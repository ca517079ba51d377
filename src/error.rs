//! Domain error types for the logistics intake server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Login flow failed (provider error, state/nonce mismatch, bad token)
    #[error("Authentication failed: {0}")]
    AuthFlow(String),

    /// Provider metadata could not be discovered at startup
    #[error("Authentication service unavailable")]
    AuthUnavailable,

    /// Invalid user input; the message is shown to the user as-is
    #[error("{0}")]
    Validation(String),

    /// Conditional write lost against an existing item
    #[error("{0}")]
    Conflict(String),

    /// Metadata store operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Blob store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Principal lacks the role required by the route
    #[error("Access denied")]
    AccessDenied,

    /// Session cookie could not be read or written
    #[error("Session error: {0}")]
    Session(String),
}

impl AppError {
    /// Whether the error comes from an external store rather than the caller.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthFlow(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::AuthUnavailable
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(_) | AppError::Storage(_) | AppError::Session(_) => {
                tracing::error!("{}", self);
                "An internal error occurred".to_string()
            }
            AppError::AuthFlow(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse::new(message))
    }
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::AuthFlow(format!("identity provider request failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthFlow(format!("ID token rejected: {}", err))
    }
}

impl From<actix_session::SessionInsertError> for AppError {
    fn from(err: actix_session::SessionInsertError) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<actix_session::SessionGetError> for AppError {
    fn from(err: actix_session::SessionGetError) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::Validation(format!("Malformed upload: {}", err))
    }
}
