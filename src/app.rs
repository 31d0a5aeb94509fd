use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Environment;
use crate::database::DatabaseManager;
use crate::handlers::{elevated, pages, protected, public};
use crate::middleware::{admin_gate_middleware, jwt_auth_middleware, require_admin_middleware};
use crate::state::AppState;

/// Full router: JSON API, admin pages, and the page gate in front of everything
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes(&state))
        // Protected API
        .merge(auth_routes(&state))
        // Elevated API
        .merge(admin_routes(&state))
        // Pages behind the gate
        .merge(page_routes(&state))
        // Global middleware
        .layer(from_fn_with_state(state.clone(), admin_gate_middleware));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.layer(cors_layer(&state)).with_state(state)
}

fn api_path(state: &AppState, path: &str) -> String {
    format!("{}{}", state.config.gate.api_prefix.trim_end_matches('/'), path)
}

fn auth_public_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(&api_path(state, "/auth/signup"), post(public::signup_post))
        .route(&api_path(state, "/auth/signin"), post(public::signin_post))
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(&api_path(state, "/auth/whoami"), get(protected::auth::whoami))
        .route(&api_path(state, "/auth/signout"), post(protected::auth::signout))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    // route_layer order: the last one added runs first
    Router::new()
        .route(&api_path(state, "/admin/check"), get(elevated::admin_check))
        .route(&api_path(state, "/admin/grants"), get(elevated::list_grants))
        .route_layer(from_fn_with_state(state.clone(), require_admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn page_routes(state: &AppState) -> Router<AppState> {
    let gate = &state.config.gate;
    let prefix = gate.protected_prefix.trim_end_matches('/');
    let shell_root = if prefix.is_empty() { "/" } else { prefix };

    Router::new()
        .route(&gate.login_path, get(pages::login_page))
        .route(shell_root, get(pages::admin_shell))
        .route(&format!("{}/*rest", prefix), get(pages::admin_shell))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = state
        .config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "FinTrack API",
            "version": version,
            "description": "Authentication and admin authorization service",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/api/auth/signup, /api/auth/signin (public - token acquisition)",
                "auth": "/api/auth/whoami, /api/auth/signout (protected)",
                "admin": "/api/admin/check, /api/admin/grants (admin only, 403 otherwise)",
                "pages": "/admin/login (public), /admin/* (gated, redirects to login)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
