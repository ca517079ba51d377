//! Actix-web extractors enforcing the admin/client role partition.
//!
//! Roles are re-derived from the session on every request. A request
//! without the required role is answered with a redirect home carrying
//! `Access denied`; the handler never runs.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use super::session::SessionContext;
use crate::api::flash::redirect_with_message;
use crate::models::SessionUser;

pub const ACCESS_DENIED: &str = "Access denied";

/// Rejection for browser routes: redirect to `/?message=Access denied`.
#[derive(Debug)]
pub struct AccessDeniedRedirect;

impl std::fmt::Display for AccessDeniedRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ACCESS_DENIED)
    }
}

impl ResponseError for AccessDeniedRedirect {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        redirect_with_message("/", ACCESS_DENIED)
    }
}

/// A signed-in admin.
///
/// ```ignore
/// async fn dashboard(admin: AdminSession) -> impl Responder {
///     // admin.email is the signed-in admin
/// }
/// ```
pub struct AdminSession {
    pub email: String,
    pub user: SessionUser,
}

/// A signed-in client. Admins are not clients.
pub struct ClientSession {
    pub email: String,
    pub user: SessionUser,
}

fn session_user(
    req: &HttpRequest,
    payload: &mut Payload,
) -> LocalBoxFuture<'static, Option<SessionUser>> {
    let fut = SessionContext::from_request(req, payload);
    let path = req.path().to_string();
    Box::pin(async move {
        match fut.await {
            Ok(session) => session.user(),
            Err(e) => {
                debug!("No session for {}: {}", path, e);
                None
            }
        }
    })
}

impl FromRequest for AdminSession {
    type Error = AccessDeniedRedirect;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = session_user(req, payload);
        Box::pin(async move {
            let user = user.await.ok_or(AccessDeniedRedirect)?;
            if !user.principal.is_admin() {
                return Err(AccessDeniedRedirect);
            }
            let email = user.principal.email().unwrap_or_default().to_string();
            Ok(AdminSession { email, user })
        })
    }
}

impl FromRequest for ClientSession {
    type Error = AccessDeniedRedirect;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = session_user(req, payload);
        Box::pin(async move {
            let user = user.await.ok_or(AccessDeniedRedirect)?;
            if !user.principal.is_client() {
                return Err(AccessDeniedRedirect);
            }
            let email = user.principal.email().unwrap_or_default().to_string();
            Ok(ClientSession { email, user })
        })
    }
}
