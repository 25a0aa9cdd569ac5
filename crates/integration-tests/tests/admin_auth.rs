//! Admin session and access control.
//!
//! Requires the admin server and a migrated database. Run with
//! `cargo test -p whimsical-frog-integration-tests -- --ignored`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::Value;

use whimsical_frog_core::UserRole;
use whimsical_frog_integration_tests::{
    TEST_PASSWORD, admin_client, admin_url, client, create_user, pool,
};

#[tokio::test]
#[ignore = "requires running admin server"]
async fn test_pages_redirect_to_login() {
    let resp = client()
        .get(format!("{}/inventory", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get("location").unwrap().to_str().unwrap(),
        "/auth/login"
    );
}

#[tokio::test]
#[ignore = "requires running admin server"]
async fn test_api_returns_401_json() {
    let resp = client()
        .get(format!("{}/api/categories", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_customer_cannot_log_in() {
    let pool = pool().await;
    let username = create_user(&pool, UserRole::Customer).await;

    let client = client();
    let resp = client
        .post(format!("{}/auth/login", admin_url()))
        .form(&[("username", username.as_str()), ("password", TEST_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = resp.text().await.unwrap();
    assert!(page.contains("Admin privileges required"));

    let resp = client
        .get(format!("{}/api/categories", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_admin_session_and_logout() {
    let pool = pool().await;
    let client = admin_client(&pool).await;

    let resp = client.get(format!("{}/", admin_url())).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/auth/logout", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client.get(format!("{}/", admin_url())).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health/ready", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
