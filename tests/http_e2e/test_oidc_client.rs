//! The real OIDC client against the mock provider.

use actix_web::http::StatusCode;
use actix_web::test;
use logistics_intake_lib::config::OidcConfig;
use logistics_intake_lib::error::AppError;
use logistics_intake_lib::services::{AuthFlow, IdentityGateway, OidcClient};
use secrecy::SecretString;
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;

use super::mock_oidc_provider::{
    IdTokenClaims, MockOidcProvider, TEST_CLIENT_ID, TEST_CLIENT_SECRET, primary_key,
    secondary_key,
};
use super::test_helpers::{
    TestContext, begin_login, create_test_app, finish_login, location, query_param, redirect_parts,
};

fn oidc_config(issuer_url: &str) -> OidcConfig {
    OidcConfig {
        issuer_url: issuer_url.to_string(),
        client_id: TEST_CLIENT_ID.to_string(),
        client_secret: SecretString::from(TEST_CLIENT_SECRET),
        redirect_url: "http://localhost:3000/callback".to_string(),
        logout_url: None,
        post_logout_redirect_url: "http://localhost:3000".to_string(),
        groups_claim: "cognito:groups".to_string(),
        admin_group: "admin".to_string(),
    }
}

fn flow() -> AuthFlow {
    AuthFlow {
        state: "state-1".to_string(),
        nonce: "nonce-1".to_string(),
    }
}

fn profile(email: &str) -> serde_json::Value {
    json!({"sub": format!("sub-{}", email), "email": email})
}

async fn discovered() -> (MockOidcProvider, OidcClient) {
    let mock = MockOidcProvider::start().await;
    let client = OidcClient::discover(&oidc_config(&mock.issuer_url))
        .await
        .expect("discovery should succeed");
    (mock, client)
}

#[actix_rt::test]
async fn test_discovery_reads_provider_metadata() {
    let (mock, client) = discovered().await;

    let metadata = client.metadata();
    assert_eq!(metadata.issuer, mock.issuer_url);
    assert_eq!(
        metadata.token_endpoint,
        format!("{}/oauth2/token", mock.issuer_url)
    );

    let logout = client.logout_url().expect("end_session_endpoint is published");
    assert!(logout.starts_with(&format!("{}/logout?", mock.issuer_url)));
    assert_eq!(
        query_param(&logout, "client_id").as_deref(),
        Some(TEST_CLIENT_ID)
    );
    assert_eq!(
        query_param(&logout, "logout_uri").as_deref(),
        Some("http://localhost:3000")
    );
}

#[actix_rt::test]
async fn test_configured_logout_url_wins() {
    let mock = MockOidcProvider::start().await;
    let mut config = oidc_config(&mock.issuer_url);
    config.logout_url = Some("https://auth.example.com/logout".to_string());

    let client = OidcClient::discover(&config).await.unwrap();

    assert!(
        client
            .logout_url()
            .unwrap()
            .starts_with("https://auth.example.com/logout?client_id=")
    );
}

#[actix_rt::test]
async fn test_discovery_failure() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = OidcClient::discover(&oidc_config(&format!("http://127.0.0.1:{}", port))).await;

    assert!(matches!(result, Err(AppError::AuthFlow(_))));
}

#[actix_rt::test]
async fn test_authorization_url_points_at_provider() {
    let (mock, client) = discovered().await;

    let url = client.authorization_url(&flow()).unwrap();

    assert!(url.starts_with(&format!("{}/oauth2/authorize?", mock.issuer_url)));
    assert_eq!(query_param(&url, "state").as_deref(), Some("state-1"));
    assert_eq!(query_param(&url, "nonce").as_deref(), Some("nonce-1"));
    assert_eq!(
        query_param(&url, "scope").as_deref(),
        Some("email openid profile")
    );
}

#[actix_rt::test]
async fn test_valid_exchange_and_user_info() {
    let (mock, client) = discovered().await;
    mock.register_login("code-1", "nonce-1", "boss@example.com", &["admin"]);

    let tokens = client.exchange_code("code-1", &flow()).await.unwrap();
    assert_eq!(tokens.id_token_claims["email"], "boss@example.com");
    assert_eq!(tokens.id_token_claims["cognito:groups"], json!(["admin"]));

    let info = client.user_info(&tokens).await.unwrap();
    assert_eq!(info.sub, "sub-boss@example.com");
    assert_eq!(info.email.as_deref(), Some("boss@example.com"));
    assert_eq!(info.name.as_deref(), Some("Test User"));
}

#[actix_rt::test]
async fn test_codes_are_single_use() {
    let (mock, client) = discovered().await;
    mock.register_login("code-1", "nonce-1", "c@example.com", &[]);

    assert!(client.exchange_code("code-1", &flow()).await.is_ok());
    let again = client.exchange_code("code-1", &flow()).await;

    assert!(matches!(again, Err(AppError::AuthFlow(_))));
}

#[actix_rt::test]
async fn test_nonce_mismatch_is_rejected() {
    let (mock, client) = discovered().await;
    mock.register_login("code-1", "some-other-nonce", "c@example.com", &[]);

    let result = client.exchange_code("code-1", &flow()).await;

    assert!(matches!(result, Err(AppError::AuthFlow(_))));
}

#[actix_rt::test]
async fn test_invalid_id_tokens_are_rejected() {
    let (mock, client) = discovered().await;
    let issuer = mock.issuer_url.clone();
    let base = || IdTokenClaims::new(&issuer, "nonce-1", "c@example.com");

    let cases = [
        ("wrong-aud", base().with("aud", json!("someone-else"))),
        ("wrong-iss", base().with("iss", json!("https://evil.example.com"))),
        ("expired", base().expired()),
    ];

    for (code, claims) in &cases {
        mock.register_code(code, claims, &primary_key(), profile("c@example.com"));
        let result = client.exchange_code(code, &flow()).await;
        assert!(
            matches!(result, Err(AppError::AuthFlow(_))),
            "{} should be rejected",
            code
        );
    }
}

#[actix_rt::test]
async fn test_unknown_signing_key_is_rejected() {
    let (mock, client) = discovered().await;
    let claims = IdTokenClaims::new(&mock.issuer_url, "nonce-1", "c@example.com");
    mock.register_code("code-1", &claims, &secondary_key(), profile("c@example.com"));

    let result = client.exchange_code("code-1", &flow()).await;

    assert!(matches!(result, Err(AppError::AuthFlow(_))));
}

#[actix_rt::test]
async fn test_key_rotation_refreshes_jwks() {
    let rotated = secondary_key();
    let (mock, client) = discovered().await;
    mock.register_login("code-1", "nonce-1", "c@example.com", &[]);
    client.exchange_code("code-1", &flow()).await.unwrap();

    // The cached JWKS only knows the primary key now
    mock.rotate_keys(rotated.clone());
    let claims = IdTokenClaims::new(&mock.issuer_url, "nonce-1", "c@example.com");
    mock.register_code("code-2", &claims, &rotated, profile("c@example.com"));

    let tokens = client.exchange_code("code-2", &flow()).await.unwrap();
    assert_eq!(tokens.id_token_claims["email"], "c@example.com");
}

#[actix_rt::test]
async fn test_wrong_client_secret_is_rejected() {
    let mock = MockOidcProvider::start().await;
    let mut config = oidc_config(&mock.issuer_url);
    config.client_secret = SecretString::from("not-the-secret");
    let client = OidcClient::discover(&config).await.unwrap();
    mock.register_login("code-1", "nonce-1", "c@example.com", &[]);

    let result = client.exchange_code("code-1", &flow()).await;

    assert!(matches!(result, Err(AppError::AuthFlow(_))));
    assert_eq!(mock.token_requests(), 1);
}

#[actix_rt::test]
async fn test_full_login_through_the_app() {
    let (mock, client) = discovered().await;
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state_with_identity(Arc::new(client))).await;

    let (authorize_url, cookie) = begin_login(&app).await;
    assert!(authorize_url.starts_with(&mock.issuer_url));
    let state = query_param(&authorize_url, "state").unwrap();
    let nonce = query_param(&authorize_url, "nonce").unwrap();
    mock.register_login("real-code", &nonce, "Boss@Example.com", &["Admin"]);

    let resp = finish_login(&app, cookie, "real-code", &state).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin");

    let cookie = super::test_helpers::session_cookie(&resp).unwrap();
    let req = test::TestRequest::get().uri("/admin").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_subject_mismatch_fails_login() {
    let (mock, client) = discovered().await;
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state_with_identity(Arc::new(client))).await;

    let (authorize_url, cookie) = begin_login(&app).await;
    let state = query_param(&authorize_url, "state").unwrap();
    let nonce = query_param(&authorize_url, "nonce").unwrap();
    let claims = IdTokenClaims::new(&mock.issuer_url, &nonce, "c@example.com");
    mock.register_code(
        "real-code",
        &claims,
        &primary_key(),
        json!({"sub": "somebody-else", "email": "c@example.com"}),
    );

    let resp = finish_login(&app, cookie, "real-code", &state).await;

    assert_eq!(
        redirect_parts(&resp),
        ("/".to_string(), Some("Authentication failed".to_string()))
    );
}
