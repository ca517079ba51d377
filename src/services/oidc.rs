//! OpenID Connect client for the authorization-code flow.
//!
//! Security features:
//! - Provider metadata discovered once at startup
//! - Client credentials sent with HTTP Basic at the token endpoint
//! - RS256 signature verification (algorithm pinned, no fallback)
//! - JWKS cached with TTL + automatic retry on key rotation (kid miss)
//! - Issuer, audience, expiry and nonce checked on every ID token
//! - HTTP timeouts on every provider call

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::identity::{AuthFlow, IdentityGateway, TokenSet};
use crate::config::OidcConfig;
use crate::error::{AppError, AppResult};
use crate::models::UserInfo;

/// JWKS cache TTL (24 hours).
const JWKS_CACHE_TTL: Duration = Duration::from_secs(86400);

/// HTTP connect timeout for provider calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP total timeout for provider calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Scopes requested at the authorization endpoint.
pub const SCOPES: &str = "email openid profile";

/// Subset of the provider's `.well-known/openid-configuration`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// Cached JWKS keys.
struct CachedKeys {
    keys: Vec<(String, DecodingKey)>,
    fetched_at: Instant,
}

/// JWKS response from the OIDC provider.
#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<serde_json::Value>,
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

/// OIDC relying party bound to one discovered provider.
pub struct OidcClient {
    metadata: ProviderMetadata,
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
    logout_url: Option<String>,
    jwks_cache: Arc<RwLock<Option<CachedKeys>>>,
    http_client: reqwest::Client,
}

fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AppError::AuthFlow(format!("Failed to build HTTP client for OIDC: {}", e)))
}

impl OidcClient {
    /// Discover provider metadata at `{issuer}/.well-known/openid-configuration`.
    pub async fn discover(config: &OidcConfig) -> AppResult<Self> {
        let http_client = build_http_client()?;
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            config.issuer_url.trim_end_matches('/')
        );

        info!("Discovering OIDC provider at {}", discovery_url);

        let metadata: ProviderMetadata = http_client
            .get(&discovery_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let logout_endpoint = config
            .logout_url
            .clone()
            .or_else(|| metadata.end_session_endpoint.clone());
        let logout_url = match logout_endpoint {
            Some(endpoint) => Some(build_logout_url(
                &endpoint,
                &config.client_id,
                &config.post_logout_redirect_url,
            )?),
            None => None,
        };

        info!(
            "OIDC provider discovered (issuer={}, jwks_uri={}, logout={})",
            metadata.issuer,
            metadata.jwks_uri,
            logout_url.is_some()
        );

        Ok(Self::from_metadata(metadata, config, logout_url, http_client))
    }

    fn from_metadata(
        metadata: ProviderMetadata,
        config: &OidcConfig,
        logout_url: Option<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            metadata,
            client_id: config.client_id.clone(),
            client_secret: SecretString::from(config.client_secret.expose_secret().to_string()),
            redirect_url: config.redirect_url.clone(),
            logout_url,
            jwks_cache: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Verify an ID token and return its claims.
    async fn verify_id_token(
        &self,
        id_token: &str,
        expected_nonce: &str,
    ) -> AppResult<serde_json::Map<String, serde_json::Value>> {
        // Decode header to get key ID (safe: header is not secret)
        let header = decode_header(id_token)?;
        let kid = header
            .kid
            .ok_or_else(|| AppError::AuthFlow("ID token missing 'kid' header".to_string()))?;

        let decoding_key = self.find_key_with_retry(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.metadata.issuer]);
        validation.set_audience(&[&self.client_id]);

        let claims = decode::<serde_json::Map<String, serde_json::Value>>(
            id_token,
            &decoding_key,
            &validation,
        )?
        .claims;

        let nonce = claims.get("nonce").and_then(|v| v.as_str()).unwrap_or("");
        if nonce.is_empty() || !bool::from(nonce.as_bytes().ct_eq(expected_nonce.as_bytes())) {
            return Err(AppError::AuthFlow("ID token nonce mismatch".to_string()));
        }

        debug!(
            "ID token verified: sub={:?}",
            claims.get("sub").and_then(|v| v.as_str())
        );

        Ok(claims)
    }

    /// Find a decoding key by kid. On miss, force a JWKS refresh and retry once.
    async fn find_key_with_retry(&self, kid: &str) -> AppResult<DecodingKey> {
        let keys = self.get_or_fetch_keys(false).await?;
        if let Some((_, key)) = keys.iter().find(|(k, _)| k == kid) {
            return Ok(key.clone());
        }

        // Kid not found: force refresh (key rotation may have occurred)
        info!(
            "OIDC: kid '{}' not in cache, forcing JWKS refresh for key rotation",
            kid
        );
        let keys = self.get_or_fetch_keys(true).await?;
        keys.iter()
            .find(|(k, _)| k == kid)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| AppError::AuthFlow(format!("Unknown key ID '{}' after JWKS refresh", kid)))
    }

    /// Get cached JWKS keys or fetch from provider. If `force_refresh` is true, skip cache.
    async fn get_or_fetch_keys(&self, force_refresh: bool) -> AppResult<Vec<(String, DecodingKey)>> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache
                && cached.fetched_at.elapsed() < JWKS_CACHE_TTL
            {
                return Ok(cached.keys.clone());
            }
        }

        match self.fetch_jwks().await {
            Ok(keys) => {
                let mut cache = self.jwks_cache.write().await;
                *cache = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => {
                // Stale keys beat no keys unless a refresh was forced
                if !force_refresh {
                    let cache = self.jwks_cache.read().await;
                    if let Some(ref cached) = *cache {
                        warn!("Failed to refresh JWKS, using stale cache: {}", e);
                        return Ok(cached.keys.clone());
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch_jwks(&self) -> AppResult<Vec<(String, DecodingKey)>> {
        info!("Fetching OIDC JWKS from {}", self.metadata.jwks_uri);

        let response: JwksResponse = self
            .http_client
            .get(&self.metadata.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = Vec::new();
        for jwk_value in &response.keys {
            let jwk: jsonwebtoken::jwk::Jwk = match serde_json::from_value(jwk_value.clone()) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to parse JWK: {}", e);
                    continue;
                }
            };

            if let Some(ref kid) = jwk.common.key_id {
                match DecodingKey::from_jwk(&jwk) {
                    Ok(key) => keys.push((kid.clone(), key)),
                    Err(e) => warn!("Failed to create decoding key from JWK {}: {}", kid, e),
                }
            }
        }

        info!("Loaded {} JWKS keys from OIDC provider", keys.len());
        Ok(keys)
    }
}

#[async_trait]
impl IdentityGateway for OidcClient {
    fn authorization_url(&self, flow: &AuthFlow) -> AppResult<String> {
        let url = Url::parse_with_params(
            &self.metadata.authorization_endpoint,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", SCOPES),
                ("state", flow.state.as_str()),
                ("nonce", flow.nonce.as_str()),
            ],
        )
        .map_err(|e| AppError::AuthFlow(format!("Invalid authorization endpoint: {}", e)))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, flow: &AuthFlow) -> AppResult<TokenSet> {
        let response = self
            .http_client
            .post(&self.metadata.token_endpoint)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::AuthFlow(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        let id_token = token_response
            .id_token
            .ok_or_else(|| AppError::AuthFlow("no id_token in token response".to_string()))?;

        let id_token_claims = self.verify_id_token(&id_token, &flow.nonce).await?;

        Ok(TokenSet {
            access_token: SecretString::from(token_response.access_token),
            id_token_claims,
        })
    }

    async fn user_info(&self, tokens: &TokenSet) -> AppResult<UserInfo> {
        let endpoint = self
            .metadata
            .userinfo_endpoint
            .as_deref()
            .ok_or_else(|| AppError::AuthFlow("provider has no userinfo endpoint".to_string()))?;

        let info: UserInfo = self
            .http_client
            .get(endpoint)
            .bearer_auth(tokens.access_token.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(info)
    }

    fn logout_url(&self) -> Option<String> {
        self.logout_url.clone()
    }
}

/// `{endpoint}?client_id=…&logout_uri=…`
fn build_logout_url(endpoint: &str, client_id: &str, logout_uri: &str) -> AppResult<String> {
    Url::parse_with_params(endpoint, &[("client_id", client_id), ("logout_uri", logout_uri)])
        .map(String::from)
        .map_err(|e| AppError::AuthFlow(format!("Invalid logout endpoint '{}': {}", endpoint, e)))
}
