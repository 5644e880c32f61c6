//! Login cookies, token refresh and permission enforcement.

mod common;

use axum::{
    body,
    http::{header::SET_COOKIE, Method, Request},
    response::Response,
};
use axum::body::Body;
use common::{TestApp, TEST_PASSWORD};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("cookie header").to_string())
        .collect()
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_login_sets_session_cookies() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": app.admin.email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let cookies = set_cookies(&response);
    let access = cookies
        .iter()
        .find(|c| c.starts_with("access_token="))
        .expect("access cookie");
    let refresh = cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .expect("refresh cookie");
    let session = cookies
        .iter()
        .find(|c| c.starts_with("session_id="))
        .expect("session cookie");
    assert!(access.contains("HttpOnly"));
    assert!(refresh.contains("HttpOnly"));
    // The session marker is read by the frontend idle-logout timer.
    assert!(!session.contains("HttpOnly"));

    let body = response_json(response).await;
    assert!(body["data"]["access_token"].as_str().is_some());
    assert_eq!(body["data"]["expires_in"], 900);
    assert_eq!(body["data"]["user"]["email"], app.admin.email);
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_login_rejects_bad_password() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": app.admin.email, "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": app.recce.email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    let refresh_cookie = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("refresh_token="))
        .expect("refresh cookie");
    let cookie_pair = refresh_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/refresh")
        .header("cookie", cookie_pair)
        .body(Body::empty())
        .expect("build request");
    let response = app
        .router()
        .oneshot(request)
        .await
        .expect("router error");
    assert_eq!(response.status(), 200);

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    let body = response_json(response).await;
    assert_eq!(body["data"]["user"]["email"], app.recce.email);
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_refresh_without_cookie_fails() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/auth/refresh", None, None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_me_returns_current_user() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&app.recce.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], app.recce.email);
    assert_eq!(body["data"]["roles"][0], "RECCE");
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_permissions_gate_resources() {
    let app = TestApp::new().await;

    // No token at all.
    let response = app.request(Method::GET, "/api/v1/stores", None, None).await;
    assert_eq!(response.status(), 401);

    // Field users cannot list users.
    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&app.recce.token))
        .await;
    assert_eq!(response.status(), 403);

    // But they can list stores, scoped to their own assignments.
    let response = app
        .request(Method::GET, "/api/v1/stores", None, Some(&app.recce.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    // Installers hold no element permissions.
    let response = app
        .request(
            Method::GET,
            "/api/v1/elements",
            None,
            Some(&app.installer.token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // The recce role reads elements but cannot create them.
    let response = app
        .request(
            Method::GET,
            "/api/v1/elements",
            None,
            Some(&app.recce.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let response = app
        .request(
            Method::POST,
            "/api/v1/elements",
            Some(json!({ "name": "Glow Sign", "standard_rate": 120 })),
            Some(&app.recce.token),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_logout_expires_cookies() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/logout",
            None,
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("access_token=") && c.contains("Max-Age=0")));
}
