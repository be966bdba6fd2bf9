//! Integration tests for signup, login and bearer-token handling.

#![cfg(feature = "sqlite")]

use axum::http::{Method, StatusCode};
use rstest::rstest;
use serde_json::json;
use test_util::{ADMIN_EMAIL, ADMIN_PASSWORD, AnyError, TestApp};

#[rstest]
#[tokio::test]
async fn health_needs_no_token() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let reply = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn signup_grants_exactly_visitor() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let session = app.signup("Alice@Example.com", "Alice").await?;
    let user = &session.user;
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["miles"], 0);
    assert_eq!(user["isVisitor"], true);
    assert_eq!(user["isMember"], false);
    assert_eq!(user["isAdmin"], false);
    let roles = user["roles"].as_array().ok_or("roles array")?;
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["kind"], "visitor");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    app.signup("alice@example.com", "Alice").await?;
    let reply = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "ALICE@example.com", "password": "x", "username": "Other" })),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    Ok(())
}

#[rstest]
#[case(json!({ "password": "x", "username": "A" }), "email is required")]
#[case(json!({ "email": "a@example.com", "username": "A" }), "password is required")]
#[case(json!({ "email": "a@example.com", "password": "x", "username": "  " }), "username is required")]
#[tokio::test]
async fn signup_validates_fields(
    #[case] body: serde_json::Value,
    #[case] expected: &str,
) -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let reply = app.send(Method::POST, "/auth/signup", None, Some(body)).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), Some(expected));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn malformed_json_is_a_validation_error() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let reply = app
        .send(Method::POST, "/auth/login", None, Some(json!("not an object")))
        .await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.error().is_some());
    Ok(())
}

#[rstest]
#[case(ADMIN_EMAIL, "wrong-password")]
#[case("nobody@example.com", ADMIN_PASSWORD)]
#[tokio::test]
async fn bad_credentials_are_unauthorized(
    #[case] email: &str,
    #[case] password: &str,
) -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let reply = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error(), Some("invalid email or password"));
    Ok(())
}

#[rstest]
#[case(None)]
#[case(Some("garbage"))]
#[case(Some("1.99999999999.deadbeef"))]
#[tokio::test]
async fn protected_routes_reject_missing_or_forged_tokens(
    #[case] token: Option<&str>,
) -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let reply = app.send(Method::GET, "/auth/me", token, None).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn me_and_verify_describe_the_caller() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let admin = app.admin().await?;
    assert_eq!(admin.user["isAdmin"], true);
    assert_eq!(admin.user["isMember"], true);

    let me = app.get("/auth/me", &admin.token).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], ADMIN_EMAIL);

    let verify = app.post("/auth/verify", &admin.token, json!({})).await?;
    assert_eq!(verify.status, StatusCode::OK);
    assert_eq!(verify.body["valid"], true);
    assert_eq!(verify.body["user"]["id"], admin.user_id);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn token_of_deleted_account_stops_working() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    let reply = app.delete("/users/me/account", &alice.token).await?;
    assert_eq!(reply.status, StatusCode::OK);
    let me = app.get("/auth/me", &alice.token).await?;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
