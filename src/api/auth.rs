//! Login, OIDC callback and logout endpoints.

use actix_web::{HttpResponse, get, web};
use tracing::{error, info, warn};

use super::flash::{redirect, redirect_with_message};
use crate::auth::SessionContext;
use crate::error::{AppError, AppResult};
use crate::services::identity::{self, AuthFlow, CallbackParams};
use crate::state::AppState;

pub const AUTH_FAILED: &str = "Authentication failed";

/// Start the authorization-code flow.
///
/// GET /login
#[get("/login")]
pub async fn login(state: web::Data<AppState>, session: SessionContext) -> AppResult<HttpResponse> {
    let flow = AuthFlow::generate();

    let authorize_url = match state.identity.authorization_url(&flow) {
        Ok(url) => url,
        Err(AppError::AuthUnavailable) => {
            error!("Login attempted while the identity provider is unavailable");
            return Ok(HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body(AppError::AuthUnavailable.to_string()));
        }
        Err(e) => return Err(e),
    };

    session.begin_flow(&flow)?;

    Ok(redirect(&authorize_url))
}

/// Provider redirect target. Completes login or redirects home with
/// `Authentication failed`.
///
/// GET /callback?code=...&state=...
#[get("/callback")]
pub async fn callback(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<CallbackParams>,
) -> HttpResponse {
    let Some(flow) = session.take_flow() else {
        warn!("Login callback without a pending login flow");
        return redirect_with_message("/", AUTH_FAILED);
    };

    let user = match identity::complete_login(
        state.identity.as_ref(),
        &state.roles,
        &query,
        &flow,
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            warn!("Login failed: {}", e);
            return redirect_with_message("/", AUTH_FAILED);
        }
    };

    if let Err(e) = session.sign_in(&user) {
        error!("Failed to store signed-in user: {}", e);
        return redirect_with_message("/", AUTH_FAILED);
    }

    redirect(user.principal.home_path())
}

/// End the local session, then sign out at the provider.
///
/// GET /logout
#[get("/logout")]
pub async fn logout(state: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    if let Some(email) = session.principal().email() {
        info!("Logout: {}", email);
    }
    session.purge();

    match state.identity.logout_url() {
        Some(url) => redirect(&url),
        None => redirect("/"),
    }
}

/// Configure authentication routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login).service(callback).service(logout);
}
