mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::TestApp;
use fintrack_api::auth::AdminPolicy;

#[tokio::test]
async fn admin_check_distinguishes_401_from_403() -> Result<()> {
    let app = TestApp::new().await?;
    app.signup("ann@example.com").await?;
    let user = app.signin("ann@example.com").await?;

    let res = app.get("/api/admin/check").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get_with_bearer("/api/admin/check", &user).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.json()?["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn granted_principal_passes_admin_check() -> Result<()> {
    let app = TestApp::new().await?;
    let id = app.signup("boss@example.com").await?;
    app.grant(&id, "admin").await?;
    let token = app.signin("boss@example.com").await?;

    let res = app.get_with_bearer("/api/admin/check", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["data"]["is_admin"], true);

    let res = app.get_with_bearer("/api/auth/whoami", &token).await?;
    assert_eq!(res.json()?["data"]["role"], "admin");
    assert_eq!(res.json()?["data"]["is_admin"], true);
    Ok(())
}

#[tokio::test]
async fn grants_listing_requires_admin() -> Result<()> {
    let app = TestApp::new().await?;
    let boss = app.signup("boss@example.com").await?;
    app.signup("ann@example.com").await?;
    app.grant(&boss, "superadmin").await?;

    let user = app.signin("ann@example.com").await?;
    let res = app.get_with_bearer("/api/admin/grants", &user).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let admin = app.signin("boss@example.com").await?;
    let res = app.get_with_bearer("/api/admin/grants", &admin).await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    let grants = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0]["principal_id"], boss.as_str());
    assert_eq!(grants[0]["role"], "superadmin");
    Ok(())
}

#[tokio::test]
async fn store_outage_is_service_unavailable() -> Result<()> {
    let app = TestApp::new().await?;
    let user = app.token_for("u2", "user")?;

    app.state.pool.close().await;

    let res = app.get_with_bearer("/api/admin/check", &user).await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn grant_authoritative_policy_ignores_bare_claim() -> Result<()> {
    let app = TestApp::with_config(|config| config.security.admin_policy = AdminPolicy::GrantAuthoritative).await?;

    // Elevated claim but no grant row
    let claim_only = app.token_for("ghost", "admin")?;
    let res = app.get_with_bearer("/api/admin/check", &claim_only).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get_with_cookie("/admin", &claim_only).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let id = app.signup("boss@example.com").await?;
    app.grant(&id, "admin").await?;
    let token = app.signin("boss@example.com").await?;
    let res = app.get_with_bearer("/api/admin/check", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}
