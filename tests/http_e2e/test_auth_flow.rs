//! Login, callback and logout through the HTTP layer.

use actix_web::http::StatusCode;
use actix_web::test;
use logistics_intake_lib::auth::MemorySessionStore;
use logistics_intake_lib::services::UnavailableGateway;
use std::sync::Arc;

use super::fakes::{FakeIdentity, InMemoryMetadata};
use super::test_helpers::{
    TestContext, begin_login, create_test_app, create_test_app_with_sessions, finish_login, location, login_admin, login_client,
    query_param, redirect_parts, session_cookie,
};

fn assert_auth_failed(resp: &actix_web::dev::ServiceResponse) {
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        redirect_parts(resp),
        ("/".to_string(), Some("Authentication failed".to_string()))
    );
}

#[actix_rt::test]
async fn test_login_redirects_with_fresh_state_and_nonce() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;

    let (first_url, _) = begin_login(&app).await;
    let (second_url, _) = begin_login(&app).await;

    assert!(first_url.starts_with("https://idp.test/oauth2/authorize?"));
    let state = query_param(&first_url, "state").unwrap();
    let nonce = query_param(&first_url, "nonce").unwrap();
    assert_eq!(state.len(), 64);
    assert_ne!(state, nonce);
    assert_ne!(Some(state), query_param(&second_url, "state"));
}

#[actix_rt::test]
async fn test_callback_lands_on_role_home() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;

    let (url, cookie) = begin_login(&app).await;
    let state = query_param(&url, "state").unwrap();
    let resp = finish_login(&app, cookie, "admin:boss@example.com", &state).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin");

    let (url, cookie) = begin_login(&app).await;
    let state = query_param(&url, "state").unwrap();
    let resp = finish_login(&app, cookie, "client:clerk@example.com", &state).await;
    assert_eq!(location(&resp), "/client");
}

#[actix_rt::test]
async fn test_signed_in_home_page_links_to_role_page() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;
    let cookie = login_client(&app).await;

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains(r#"href="/client""#));
    assert!(body.contains(r#"href="/logout""#));
}

#[actix_rt::test]
async fn test_state_mismatch_fails_without_exchange() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;

    let (_, cookie) = begin_login(&app).await;
    let resp = finish_login(&app, cookie, "admin:boss@example.com", "forged-state").await;

    assert_auth_failed(&resp);
    assert!(ctx.identity.exchanged_codes().is_empty());

    // The session is still anonymous
    if let Some(cookie) = session_cookie(&resp) {
        let req = test::TestRequest::get().uri("/admin").cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            redirect_parts(&resp).1.as_deref(),
            Some("Access denied")
        );
    }
}

#[actix_rt::test]
async fn test_flow_values_are_single_use() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;

    let (url, cookie) = begin_login(&app).await;
    let state = query_param(&url, "state").unwrap();

    let resp = finish_login(&app, cookie, "client:clerk@example.com", "wrong").await;
    assert_auth_failed(&resp);

    // Retrying with the right state on the updated session finds no flow
    let cookie = session_cookie(&resp).expect("flow removal rewrites the cookie");
    let resp = finish_login(&app, cookie, "client:clerk@example.com", &state).await;
    assert_auth_failed(&resp);
    assert!(ctx.identity.exchanged_codes().is_empty());
}

#[actix_rt::test]
async fn test_callback_without_login_flow() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;

    let req = test::TestRequest::get()
        .uri("/callback?code=admin%3Aboss%40example.com&state=anything")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_auth_failed(&resp);
    assert!(ctx.identity.exchanged_codes().is_empty());
}

#[actix_rt::test]
async fn test_provider_error_and_rejected_code() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;

    let (url, cookie) = begin_login(&app).await;
    let state = query_param(&url, "state").unwrap();
    let uri = format!(
        "/callback?error=access_denied&error_description=denied&state={}",
        state
    );
    let req = test::TestRequest::get().uri(&uri).cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_auth_failed(&resp);

    let (url, cookie) = begin_login(&app).await;
    let state = query_param(&url, "state").unwrap();
    let resp = finish_login(&app, cookie, "garbage", &state).await;
    assert_auth_failed(&resp);
    assert_eq!(ctx.identity.exchanged_codes(), vec!["garbage".to_string()]);
}

#[actix_rt::test]
async fn test_login_when_provider_unavailable() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state_with_identity(Arc::new(UnavailableGateway))).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test::read_body(resp).await;
    assert_eq!(body, "Authentication service unavailable");
}

#[actix_rt::test]
async fn test_logout_clears_session_and_redirects_to_provider() {
    let ctx = TestContext::with(
        InMemoryMetadata::default(),
        FakeIdentity::with_logout_url("https://idp.test/logout?client_id=c&logout_uri=x"),
    );
    let app = create_test_app(ctx.state()).await;
    let cookie = login_admin(&app).await;

    let req = test::TestRequest::get()
        .uri("/logout")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp),
        "https://idp.test/logout?client_id=c&logout_uri=x"
    );
    let cleared = session_cookie(&resp).expect("logout expires the session cookie");
    assert!(cleared.value().is_empty());

    let req = test::TestRequest::get().uri("/admin").cookie(cleared).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(redirect_parts(&resp).1.as_deref(), Some("Access denied"));
}

#[actix_rt::test]
async fn test_pre_logout_cookie_is_rejected_after_logout() {
    let ctx = TestContext::new();
    let sessions = MemorySessionStore::new();
    let app = create_test_app_with_sessions(ctx.state(), sessions.clone()).await;
    let admin = login_admin(&app).await;
    let client = login_client(&app).await;
    assert_eq!(sessions.len().await, 2);

    for cookie in [&admin, &client] {
        let req = test::TestRequest::get()
            .uri("/logout")
            .cookie(cookie.clone())
            .to_request();
        test::call_service(&app, req).await;
    }
    assert!(sessions.is_empty().await);

    // Replaying the cookies captured before logout must not sign anyone in
    for (cookie, path) in [(admin, "/admin"), (client, "/client")] {
        let req = test::TestRequest::get().uri(path).cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            redirect_parts(&resp),
            ("/".to_string(), Some("Access denied".to_string()))
        );
    }
}

#[actix_rt::test]
async fn test_logout_without_provider_logout_goes_home() {
    let ctx = TestContext::new();
    let app = create_test_app(ctx.state()).await;
    let cookie = login_client(&app).await;

    let req = test::TestRequest::get().uri("/logout").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    // Signed-out requests may log out too
    let resp = test::call_service(&app, test::TestRequest::get().uri("/logout").to_request()).await;
    assert_eq!(location(&resp), "/");
}
