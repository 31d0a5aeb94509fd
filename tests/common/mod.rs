#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use fintrack_api::app::app;
use fintrack_api::auth::{FixedClock, Subject};
use fintrack_api::config::{AppConfig, DatabaseConfig};
use fintrack_api::database::DatabaseManager;
use fintrack_api::state::AppState;

pub const PASSWORD: &str = "correct-horse-battery";

/// In-process server over an in-memory database with a controllable clock
pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Development preset with a fixed secret and cheap hashing, then `adjust`
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "integration-test-secret".to_string();
        config.security.password_cost = 4;
        config.database = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            lookup_timeout_ms: 500,
        };
        adjust(&mut config);

        let pool = DatabaseManager::connect(&config.database).await?;
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().context("fixed time")?,
        ));
        let state = AppState::from_parts(config, pool, clock.clone())?;
        let router = app(state.clone());

        Ok(Self { state, clock, router })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Request::get(uri).body(Body::empty())?).await
    }

    pub async fn get_with_bearer(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn get_with_cookie(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let request = Request::get(uri)
            .header(header::COOKIE, format!("auth-token={}", token))
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, bearer: Option<&str>) -> Result<TestResponse> {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(request.body(Body::from(body.to_string()))?).await
    }

    /// Register a principal through the API and return its id
    pub async fn signup(&self, email: &str) -> Result<String> {
        let res = self
            .post_json(
                "/api/auth/signup",
                json!({ "email": email, "name": "Test User", "password": PASSWORD }),
                None,
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "signup failed: {}", res.text());
        let body = res.json()?;
        body["data"]["id"].as_str().map(str::to_string).context("signup returned no id")
    }

    /// Sign in through the API and return the bearer token
    pub async fn signin(&self, email: &str) -> Result<String> {
        let res = self
            .post_json("/api/auth/signin", json!({ "email": email, "password": PASSWORD }), None)
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "signin failed: {}", res.text());
        let body = res.json()?;
        body["data"]["token"].as_str().map(str::to_string).context("signin returned no token")
    }

    pub async fn grant(&self, principal_id: &str, role: &str) -> Result<()> {
        self.state.grants().create(principal_id, role).await?;
        Ok(())
    }

    /// Token minted directly, bypassing signin
    pub fn token_for(&self, subject_id: &str, role: &str) -> Result<String> {
        let issued = self.state.tokens.issue(&Subject {
            subject_id: subject_id.to_string(),
            email: format!("{}@example.com", subject_id),
            role: role.to_string(),
        })?;
        Ok(issued.token)
    }
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION)?.to_str().ok()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers.get(header::SET_COOKIE)?.to_str().ok()
    }
}
