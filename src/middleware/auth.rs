use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::cookie::read_cookie;
use crate::audit::{self, AuditEvent};
use crate::auth::{AuthError, Claims, InvalidTokenReason};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, inserted into request extensions once the token verifies
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject_id: String,
    pub email: String,
    pub role: String,
    pub claims: Claims,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role.clone(),
            claims,
        }
    }
}

/// JWT authentication middleware for API routes.
///
/// Reads `Authorization: Bearer` first and falls back to the auth cookie so
/// browser calls from the admin pages work without extra plumbing.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match extract_bearer(request.headers()) {
        Ok(token) => token,
        Err(AuthError::MissingToken) => read_cookie(request.headers(), &state.config.gate.cookie_name)
            .ok_or_else(|| {
                audit::record(AuditEvent::MissingToken, None, request.uri().path());
                ApiError::from(AuthError::MissingToken)
            })?,
        Err(e) => return Err(e.into()),
    };

    let claims = state.tokens.verify(&token).await.map_err(|e| {
        audit::record(AuditEvent::InvalidToken, None, &format!("{} on {}", e, request.uri().path()));
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Admin gate for API routes; must run after `jwt_auth_middleware`.
/// Answers 403 rather than redirecting.
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before admin check"))?;

    if let Err(e) = state.resolver.check(&auth_user.claims).await {
        if matches!(e, AuthError::InsufficientPrivilege) {
            audit::record(AuditEvent::PrivilegeDenied, Some(&auth_user.subject_id), request.uri().path());
        }
        return Err(e.into());
    }

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// A missing header is `MissingToken`; a present but unusable one is malformed.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers.get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidToken(InvalidTokenReason::Malformed))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidToken(InvalidTokenReason::Malformed)),
    }
}
