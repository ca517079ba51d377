//! Session access for the login flow and the signed-in user.
//!
//! Session state lives in a server-side [`MemorySessionStore`]; the cookie
//! carries only the encrypted session key. Sessions hold the one-time login
//! flow values between `/login` and `/callback`, and the signed-in user after.

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::store::MemorySessionStore;
use crate::error::AppResult;
use crate::models::{Principal, SessionUser};
use crate::services::AuthFlow;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "intake_session";

/// Fixed session lifetime in hours.
pub const SESSION_TTL_HOURS: i64 = 24;

const AUTH_FLOW_KEY: &str = "auth_flow";
const USER_KEY: &str = "user";

/// Derive the cookie encryption key from the configured secret.
///
/// The secret must be at least 32 bytes (checked when the configuration is
/// loaded).
pub fn session_key(secret: &SecretString) -> Key {
    Key::derive_from(secret.expose_secret().as_bytes())
}

/// Build the session middleware over `store`.
///
/// Every worker must get a clone of the same store.
pub fn session_middleware(
    store: MemorySessionStore,
    key: Key,
    secure: bool,
) -> SessionMiddleware<MemorySessionStore> {
    SessionMiddleware::builder(store, key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_path("/".to_string())
        .cookie_secure(secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        // Lax so the cookie survives the provider's redirect back to /callback
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(
            PersistentSession::default()
                .session_ttl(actix_web::cookie::time::Duration::hours(SESSION_TTL_HOURS)),
        )
        .build()
}

/// Typed view over the actix session.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Remember the flow values issued at `/login`.
    pub fn begin_flow(&self, flow: &AuthFlow) -> AppResult<()> {
        self.0.insert(AUTH_FLOW_KEY, flow)?;
        Ok(())
    }

    /// Remove and return the pending flow values. They are single use.
    pub fn take_flow(&self) -> Option<AuthFlow> {
        let flow = match self.0.get::<AuthFlow>(AUTH_FLOW_KEY) {
            Ok(flow) => flow,
            Err(e) => {
                warn!("Unreadable login flow in session: {}", e);
                None
            }
        };
        self.0.remove(AUTH_FLOW_KEY);
        flow
    }

    /// Store the signed-in user under a fresh session id.
    pub fn sign_in(&self, user: &SessionUser) -> AppResult<()> {
        self.0.renew();
        self.0.insert(USER_KEY, user)?;
        Ok(())
    }

    /// The signed-in user, if any.
    ///
    /// An entry that no longer deserializes is treated as signed out.
    pub fn user(&self) -> Option<SessionUser> {
        match self.0.get::<SessionUser>(USER_KEY) {
            Ok(user) => user,
            Err(e) => {
                warn!("Invalid user in session: {}", e);
                None
            }
        }
    }

    /// Principal of the current request, `Anonymous` when signed out.
    pub fn principal(&self) -> Principal {
        self.user().map(|u| u.principal).unwrap_or_default()
    }

    /// Delete the session server-side and expire the cookie.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
