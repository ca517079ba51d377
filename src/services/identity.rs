//! Identity gateway seam and login completion.
//!
//! The gateway talks to the OpenID Connect provider. Everything that
//! decides who the user is (state check, email, role) lives here so the
//! HTTP layer only moves values between the session and the gateway.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::user::has_group;
use crate::models::{Principal, SessionUser, UserInfo};

/// One-time values correlating `/login` with `/callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFlow {
    pub state: String,
    pub nonce: String,
}

impl AuthFlow {
    /// Fresh random state and nonce (32 random bytes each, hex encoded).
    pub fn generate() -> Self {
        Self {
            state: generate_random_hex(),
            nonce: generate_random_hex(),
        }
    }
}

/// Query parameters the provider sends to the redirect URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Tokens obtained from a successful code exchange.
///
/// The ID token has already been verified; only its claims are kept.
#[derive(Debug)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub id_token_claims: serde_json::Map<String, serde_json::Value>,
}

impl TokenSet {
    fn claim_str(&self, name: &str) -> Option<&str> {
        self.id_token_claims.get(name).and_then(|v| v.as_str())
    }
}

/// External OpenID Connect provider.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Authorization endpoint URL carrying the flow's state and nonce.
    fn authorization_url(&self, flow: &AuthFlow) -> AppResult<String>;

    /// Exchange an authorization code and verify the returned ID token,
    /// including its `nonce` against `flow`.
    async fn exchange_code(&self, code: &str, flow: &AuthFlow) -> AppResult<TokenSet>;

    async fn user_info(&self, tokens: &TokenSet) -> AppResult<UserInfo>;

    /// Provider logout URL, if the provider supports one.
    fn logout_url(&self) -> Option<String>;
}

/// Gateway installed when provider discovery failed at startup.
///
/// Every login attempt fails with [`AppError::AuthUnavailable`].
#[derive(Debug, Default)]
pub struct UnavailableGateway;

#[async_trait]
impl IdentityGateway for UnavailableGateway {
    fn authorization_url(&self, _flow: &AuthFlow) -> AppResult<String> {
        Err(AppError::AuthUnavailable)
    }

    async fn exchange_code(&self, _code: &str, _flow: &AuthFlow) -> AppResult<TokenSet> {
        Err(AppError::AuthUnavailable)
    }

    async fn user_info(&self, _tokens: &TokenSet) -> AppResult<UserInfo> {
        Err(AppError::AuthUnavailable)
    }

    fn logout_url(&self) -> Option<String> {
        None
    }
}

/// Maps ID token group claims to roles.
#[derive(Debug, Clone)]
pub struct RoleMapping {
    pub groups_claim: String,
    pub admin_group: String,
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self {
            groups_claim: crate::config::defaults::DEV_OIDC_GROUPS_CLAIM.to_string(),
            admin_group: crate::config::defaults::DEV_OIDC_ADMIN_GROUP.to_string(),
        }
    }
}

impl RoleMapping {
    pub fn is_admin(&self, tokens: &TokenSet) -> bool {
        has_group(&tokens.id_token_claims, &self.groups_claim, &self.admin_group)
    }
}

/// Finish the login flow started with `flow`.
///
/// Checks the provider's error parameter, the returned state (constant
/// time), exchanges the code, loads the profile and derives the principal.
/// Any failure is [`AppError::AuthFlow`] (or `AuthUnavailable`); no partial
/// result escapes.
pub async fn complete_login(
    gateway: &dyn IdentityGateway,
    roles: &RoleMapping,
    params: &CallbackParams,
    flow: &AuthFlow,
) -> AppResult<SessionUser> {
    if let Some(ref error) = params.error {
        return Err(AppError::AuthFlow(format!(
            "provider returned '{}': {}",
            error,
            params.error_description.as_deref().unwrap_or("no description")
        )));
    }

    let returned_state = params.state.as_deref().unwrap_or("");
    if returned_state.is_empty()
        || !bool::from(returned_state.as_bytes().ct_eq(flow.state.as_bytes()))
    {
        return Err(AppError::AuthFlow("state mismatch".to_string()));
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::AuthFlow("missing authorization code".to_string()))?;

    let tokens = gateway.exchange_code(code, flow).await?;
    let profile = gateway.user_info(&tokens).await?;

    if let Some(id_sub) = tokens.claim_str("sub")
        && id_sub != profile.sub
    {
        return Err(AppError::AuthFlow(
            "user-info subject does not match ID token".to_string(),
        ));
    }

    let email = profile
        .email
        .clone()
        .or_else(|| tokens.claim_str("email").map(String::from))
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::AuthFlow("no email in user profile".to_string()))?;

    let principal = Principal::signed_in(email, roles.is_admin(&tokens));
    info!(
        "Login completed: email={}, admin={}",
        principal.email().unwrap_or_default(),
        principal.is_admin()
    );

    Ok(SessionUser { principal, profile })
}

/// Generate a cryptographically random string.
fn generate_random_hex() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}
