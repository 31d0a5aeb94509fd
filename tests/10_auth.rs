mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new().await?;
    let res = app.get("/health").await?;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert_eq!(body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn signup_returns_principal_without_hash() -> Result<()> {
    let app = TestApp::new().await?;
    let res = app
        .post_json(
            "/api/auth/signup",
            json!({ "email": " Ann@Example.com ", "name": "Ann", "password": PASSWORD }),
            None,
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    let body = res.json()?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ann@example.com");
    assert!(body["data"].get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_signup_is_conflict() -> Result<()> {
    let app = TestApp::new().await?;
    app.signup("ann@example.com").await?;

    let res = app
        .post_json(
            "/api/auth/signup",
            json!({ "email": "ANN@example.com", "name": "Ann", "password": PASSWORD }),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.json()?["success"], false);
    Ok(())
}

#[tokio::test]
async fn short_password_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let res = app
        .post_json(
            "/api/auth/signup",
            json!({ "email": "ann@example.com", "name": "Ann", "password": "short" }),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_body_gets_error_envelope() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app.post_json("/api/auth/signin", json!({ "email": "ann@example.com" }), None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let body = res.json()?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn signin_issues_token_and_cookie() -> Result<()> {
    let app = TestApp::new().await?;
    let id = app.signup("ann@example.com").await?;

    let res = app
        .post_json("/api/auth/signin", json!({ "email": "ann@example.com", "password": PASSWORD }), None)
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    let token = body["data"]["token"].as_str().unwrap_or_default();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["expires_in"], 24 * 3600);
    assert_eq!(body["data"]["user"]["id"], id.as_str());
    assert_eq!(body["data"]["user"]["role"], "user");

    let cookie = res.set_cookie().unwrap_or_default();
    assert!(cookie.starts_with(&format!("auth-token={};", token)), "{}", cookie);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_share_one_answer() -> Result<()> {
    let app = TestApp::new().await?;
    app.signup("ann@example.com").await?;

    let wrong_password = app
        .post_json("/api/auth/signin", json!({ "email": "ann@example.com", "password": "wrong-password" }), None)
        .await?;
    let unknown_email = app
        .post_json("/api/auth/signin", json!({ "email": "bob@example.com", "password": PASSWORD }), None)
        .await?;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json()?, unknown_email.json()?);
    Ok(())
}

#[tokio::test]
async fn whoami_reports_claims() -> Result<()> {
    let app = TestApp::new().await?;
    let id = app.signup("ann@example.com").await?;
    let token = app.signin("ann@example.com").await?;

    let res = app.get_with_bearer("/api/auth/whoami", &token).await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["email"], "ann@example.com");
    assert_eq!(body["data"]["is_admin"], false);
    Ok(())
}

#[tokio::test]
async fn whoami_accepts_cookie() -> Result<()> {
    let app = TestApp::new().await?;
    app.signup("ann@example.com").await?;
    let token = app.signin("ann@example.com").await?;

    let res = app.get_with_cookie("/api/auth/whoami", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn whoami_without_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new().await?;
    let res = app.get("/api/auth/whoami").await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let body = res.json()?;
    assert_eq!(body["success"], false);
    assert!(body["code"].is_string());
    Ok(())
}

#[tokio::test]
async fn expired_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new().await?;
    app.signup("ann@example.com").await?;
    let token = app.signin("ann@example.com").await?;

    app.clock.advance(Duration::hours(24) + Duration::seconds(1));

    let res = app.get_with_bearer("/api/auth/whoami", &token).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn signout_revokes_token_and_clears_cookie() -> Result<()> {
    let app = TestApp::new().await?;
    app.signup("ann@example.com").await?;
    let token = app.signin("ann@example.com").await?;

    let res = app.post_json("/api/auth/signout", json!({}), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["data"]["revoked"], true);
    assert!(res.set_cookie().unwrap_or_default().contains("Max-Age=0"));

    let res = app.get_with_bearer("/api/auth/whoami", &token).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_from_another_secret_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let other = TestApp::with_config(|config| config.security.jwt_secret = "some-other-secret".to_string()).await?;
    let foreign = other.token_for("u1", "admin")?;

    let res = app.get_with_bearer("/api/auth/whoami", &foreign).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
