use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
    Extension,
};
use serde_json::{json, Value};

use crate::audit::{self, AuditEvent};
use crate::middleware::cookie::clear_auth_cookie;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/auth/whoami - claims of the calling token plus the admin verdict
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "principal_uuid",
///     "email": "ann@example.com",
///     "role": "user",
///     "is_admin": false,
///     "issued_at": "2026-01-01T00:00:00Z",
///     "expires_at": "2026-01-02T00:00:00Z"
///   }
/// }
/// ```
pub async fn whoami(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let is_admin = state.resolver.is_admin(&user.claims).await;

    Ok(ApiResponse::success(json!({
        "id": user.subject_id,
        "email": user.email,
        "role": user.role,
        "is_admin": is_admin,
        "issued_at": user.claims.issued_at(),
        "expires_at": user.claims.expires_at(),
    })))
}

/// POST /api/auth/signout - revoke the calling token and clear the auth cookie
pub async fn signout(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    let revoked = state.tokens.revoke(&user.claims).await;
    audit::record(AuditEvent::Signout, Some(&user.subject_id), &format!("jti {}", user.claims.jti));

    let cookie = clear_auth_cookie(&state.config.gate, state.secure_cookies());
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::success(json!({ "signed_out": true, "revoked": revoked })),
    )
}
