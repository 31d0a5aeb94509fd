// handlers/public/auth/signin.rs - POST /api/auth/signin handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::cookie::auth_cookie;
use crate::middleware::ApiResponse;
use crate::services::SigninRequest;
use crate::state::AppState;

/// POST /api/auth/signin - exchange credentials for a bearer token
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 86400,
///     "user": { "id": "...", "email": "...", "name": "...", "role": "user" }
///   }
/// }
/// ```
///
/// The same token is also set as the auth cookie so the admin pages work
/// right after a browser signin.
pub async fn signin_post(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let outcome = state.accounts().signin(&request).await?;

    let cookie = auth_cookie(&state.config.gate, &outcome.issued.token, state.secure_cookies());
    let body = json!({
        "token": outcome.issued.token,
        "expires_in": outcome.issued.expires_in(),
        "user": {
            "id": outcome.principal.id,
            "email": outcome.principal.email,
            "name": outcome.principal.name,
            "role": outcome.issued.claims.role,
        }
    });

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), ApiResponse::success(body)))
}
