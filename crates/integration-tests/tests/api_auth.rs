mod common;

use axum::http::StatusCode;
use common::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_defaults_username_to_email() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/verdespace/auth/register",
            None,
            json!({ "email": "testuser@Example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "testuser@example.com");
    assert_eq!(body["username"], "testuser@example.com");
    assert_eq!(body["is_staff"], false);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.user_token("dup@example.com").await;
    let (status, body) = app
        .post(
            "/api/verdespace/auth/register",
            None,
            json!({ "email": "dup@example.com", "password": PASSWORD, "username": "other" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/verdespace/auth/register",
            None,
            json!({ "email": "a@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "password");
}

#[tokio::test]
async fn wrong_password_gets_401() {
    let app = TestApp::new();
    app.user_token("user@example.com").await;
    let (status, _) = app
        .post(
            "/api/verdespace/auth/token",
            None,
            json!({ "email": "user@example.com", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_grants_access_and_garbage_does_not() {
    let app = TestApp::new();
    let token = app.user_token("reader@example.com").await;

    assert_eq!(app.get("/api/verdespace/plants", Some(&token)).await.0, StatusCode::OK);
    assert_eq!(app.get("/api/verdespace/plants", None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/verdespace/plants", Some("forged.token.value")).await.0,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn malformed_json_is_a_400() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/verdespace/auth/register", None, json!({ "email": 42 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_needs_no_identity() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/verdespace/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn bootstrapped_staff_can_curate_plants_on_the_memory_store() {
    let app = TestApp::new();
    let created = app
        .services
        .users
        .ensure_staff("admin@verdespace.test", PASSWORD)
        .await
        .unwrap();
    assert!(created.unwrap().is_staff);
    // A restart with the same settings finds the account and keeps it.
    assert!(app
        .services
        .users
        .ensure_staff("admin@verdespace.test", PASSWORD)
        .await
        .unwrap()
        .is_none());

    let staff = app.login("admin@verdespace.test").await;
    app.create_plant(&staff, "Spider Plant").await;
    assert_eq!(app.plant_count(&staff).await, 1);
}
