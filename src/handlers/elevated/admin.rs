// handlers/elevated/admin.rs - /api/admin/* handlers

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::database::models::AdminGrant;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/admin/check - 200 for admins; the middleware answers 403 otherwise
pub async fn admin_check(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": user.subject_id,
        "email": user.email,
        "is_admin": true,
    })))
}

/// GET /api/admin/grants - every admin grant in the credential store
pub async fn list_grants(State(state): State<AppState>) -> ApiResult<Vec<AdminGrant>> {
    let grants = state.grants().list().await?;
    Ok(ApiResponse::success(grants))
}
