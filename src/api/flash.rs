//! Redirects carrying a one-line message in the `message` query parameter.

use actix_web::HttpResponse;
use actix_web::http::header;
use serde::Deserialize;

/// Query string of pages that display a flash message.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub message: Option<String>,
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

/// `302 Found` to `{path}?message={message}`, percent-encoded.
pub fn redirect_with_message(path: &str, message: &str) -> HttpResponse {
    redirect(&format!("{}?message={}", path, urlencoding::encode(message)))
}
