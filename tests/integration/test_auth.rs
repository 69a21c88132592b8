use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use gridflow::db;
use gridflow::dtos::{GoogleAuthUrlDto, SessionDto};
use serde_json::json;

use crate::common::*;

fn login_request(email: &str, password: &str) -> actix_http::Request {
    TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": email, "password": password}))
        .to_request()
}

#[tokio::test]
async fn test_register_login_logout() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let registered = register_ok(&app, "Ada@Example.com").await;
    assert_eq!(registered.user.email, "ada@example.com", "emails are lowercased");
    assert!(!registered.user.is_admin);
    assert!(!registered.user.google_linked);
    assert_eq!(registered.token.len(), 64);

    let (status, body) = call_json(&app, login_request("ADA@example.com", TEST_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    let session: SessionDto = serde_json::from_value(body).unwrap();
    assert_ne!(session.token, registered.token, "every login opens a new session");
    assert!(session.user.last_login_at.is_some());

    let req = authed(TestRequest::get().uri("/auth/me"), &session.token).to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(registered.user.id));

    let req = authed(TestRequest::post().uri("/auth/logout"), &session.token).to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let req = authed(TestRequest::get().uri("/auth/me"), &session.token).to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "logged out session is gone");

    let req = authed(TestRequest::get().uri("/auth/me"), &registered.token).to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK, "other sessions stay valid");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    register_ok(&app, "ada@example.com").await;

    let (status, wrong_password) =
        call_json(&app, login_request("ada@example.com", "not the password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) =
        call_json(&app, login_request("nobody@example.com", TEST_PASSWORD)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    register_ok(&app, "ada@example.com").await;

    let req = TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "ADA@example.com", "password": TEST_PASSWORD, "display_name": "Again"}))
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "not-an-email", "password": "short", "display_name": ""}))
        .to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 3, "{}", body);
    assert_eq!(body["fields"], json!(["email", "password", "display_name"]));
}

#[tokio::test]
async fn test_admin_emails_become_admins() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let admin = register_ok(&app, &ADMIN_EMAIL.to_uppercase()).await;
    assert!(admin.user.is_admin);
}

#[tokio::test]
async fn test_login_never_demotes_db_admins() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let user = register_ok(&app, "ada@example.com").await;

    let mut conn = state.pool.get().await.unwrap();
    db::set_admin(&mut conn, user.user.id, true).await.unwrap();
    drop(conn);

    let (status, body) = call_json(&app, login_request("ada@example.com", TEST_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    let session: SessionDto = serde_json::from_value(body).unwrap();
    assert!(session.user.is_admin, "not listed in ADMIN_EMAILS but flagged in the database");
    assert!(session.user.last_login_at.is_some());
}

#[tokio::test]
async fn test_expired_sessions_are_rejected_and_purged() {
    let (_g, state) = setup_test_app_with(|c| c.auth.session_ttl = std::time::Duration::ZERO).await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;

    let req = authed(TestRequest::get().uri("/auth/me"), &session.token).to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut conn = state.pool.get().await.unwrap();
    let (sessions, _) = db::delete_expired_sessions(&mut conn).await.unwrap();
    assert_eq!(sessions, 1);
}

#[tokio::test]
async fn test_google_not_configured() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let req = TestRequest::get().uri("/auth/google/url").to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Google stand-in: the first token request fails with 500 when `flaky`.
fn spawn_google(user: serde_json::Value, flaky: bool) -> MockServer {
    spawn_mock_server(Arc::new(move |req: &CapturedRequest, n: usize| match req.path.as_str() {
        "/token" if flaky && n == 0 => (500, r#"{"error":"backend"}"#.to_string()),
        "/token" if req.body.contains("code=bad-code") => {
            (400, r#"{"error":"invalid_grant"}"#.to_string())
        }
        "/token" => (200, r#"{"access_token":"google-access","token_type":"Bearer"}"#.to_string()),
        "/userinfo" if req.headers.get("authorization").map(String::as_str)
            == Some("Bearer google-access") =>
        {
            (200, user.to_string())
        }
        _ => (401, "{}".to_string()),
    }))
}

async fn google_state<S, B>(app: &S) -> GoogleAuthUrlDto
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let req = TestRequest::get().uri("/auth/google/url").to_request();
    let (status, body) = call_json(app, req).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).unwrap()
}

fn callback(code: &str, state: &str) -> actix_http::Request {
    TestRequest::post()
        .uri("/auth/google/callback")
        .set_json(json!({"code": code, "state": state}))
        .to_request()
}

#[tokio::test]
async fn test_google_sign_in_creates_account() {
    let google = spawn_google(
        json!({"sub": "g-123", "email": "Grace@Example.com", "email_verified": true, "name": "Grace"}),
        true,
    );
    let base = google.base_url.clone();
    let (_g, state) = setup_test_app_with(|c| c.auth.google = Some(google_config(&base))).await;
    let app = test_service!(state);

    let start = google_state(&app).await;
    assert!(start.url.contains("client_id=test-client"));
    assert!(start.url.contains(&format!("state={}", start.state)));

    let (status, body) = call_json(&app, callback("good-code", &start.state)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let session: SessionDto = serde_json::from_value(body).unwrap();
    assert_eq!(session.user.email, "grace@example.com");
    assert_eq!(session.user.display_name, "Grace");
    assert!(session.user.google_linked);

    let token_calls = google.requests().iter().filter(|r| r.path == "/token").count();
    assert_eq!(token_calls, 2, "the 500 was retried");

    let (status, _) = call_json(&app, callback("good-code", &start.state)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "states are single-use");

    let again = google_state(&app).await;
    let (status, body) = call_json(&app, callback("good-code", &again.state)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], json!(session.user.id), "same account on return");
}

#[tokio::test]
async fn test_google_links_existing_account() {
    let google = spawn_google(
        json!({"sub": "g-ada", "email": "ada@example.com", "email_verified": true}),
        false,
    );
    let base = google.base_url.clone();
    let (_g, state) = setup_test_app_with(|c| c.auth.google = Some(google_config(&base))).await;
    let app = test_service!(state);
    let registered = register_ok(&app, "ada@example.com").await;

    let start = google_state(&app).await;
    let (status, body) = call_json(&app, callback("good-code", &start.state)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["id"], json!(registered.user.id));
    assert_eq!(body["user"]["google_linked"], true);

    let (status, _) = call_json(&app, login_request("ada@example.com", TEST_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK, "password still works");
}

#[tokio::test]
async fn test_google_rejects_unverified_email_and_bad_codes() {
    let google = spawn_google(
        json!({"sub": "g-ada", "email": "ada@example.com", "email_verified": false}),
        false,
    );
    let base = google.base_url.clone();
    let (_g, state) = setup_test_app_with(|c| c.auth.google = Some(google_config(&base))).await;
    let app = test_service!(state);
    register_ok(&app, "ada@example.com").await;

    let start = google_state(&app).await;
    let (status, _) = call_json(&app, callback("good-code", &start.state)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "unverified email cannot take over");

    let start = google_state(&app).await;
    let (status, _) = call_json(&app, callback("bad-code", &start.state)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call_json(&app, callback("good-code", "forged-state")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_unreachable_is_bad_gateway() {
    let (_g, state) = setup_test_app_with(|c| {
        c.auth.google = Some(google_config("http://127.0.0.1:9"));
    })
    .await;
    let app = test_service!(state);

    let start = google_state(&app).await;
    let (status, _) = call_json(&app, callback("good-code", &start.state)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
