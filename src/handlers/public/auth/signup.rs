// handlers/public/auth/signup.rs - POST /api/auth/signup handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::database::models::Principal;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::SignupRequest;
use crate::state::AppState;

/// POST /api/auth/signup - register a principal with email and password
///
/// ```json
/// { "email": "ann@example.com", "name": "Ann", "password": "at-least-8" }
/// ```
///
/// Answers 201 with the stored principal (never the hash), 409 when the
/// email is already registered and 400 on validation failures.
pub async fn signup_post(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<Principal> {
    let Json(request) = payload?;
    let principal = state.accounts().signup(&request).await?;
    Ok(ApiResponse::created(principal))
}
