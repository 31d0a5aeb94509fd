//! Page-level gate for the admin prefix.
//!
//! Every request under the protected prefix goes through one pass of:
//! find a token, verify it, check admin privilege, then either forward
//! (re-homing the token into the auth cookie) or redirect to the login page.
//! All failures collapse into the same redirect.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use super::auth::{extract_bearer, AuthUser};
use super::cookie::{auth_cookie, read_cookie};
use crate::audit::{self, AuditEvent};
use crate::auth::{AuthError, Claims, InvalidTokenReason};
use crate::config::GateConfig;
use crate::state::AppState;

/// Where the gate found the token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCarrier {
    Cookie,
    Header,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoToken,
    InvalidToken(InvalidTokenReason),
    NotAdmin,
}

#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Path is outside the prefix, is the login page, or belongs to the API
    Bypass,
    Forward {
        token: String,
        carrier: TokenCarrier,
        claims: Claims,
    },
    Redirect {
        location: String,
        reason: DenyReason,
    },
}

/// True when the gate must authorize this path
pub fn is_gated(gate: &GateConfig, path: &str) -> bool {
    under_prefix(path, &gate.protected_prefix) && !is_login_path(gate, path) && !touches_api(gate, path)
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

fn is_login_path(gate: &GateConfig, path: &str) -> bool {
    path.trim_end_matches('/') == gate.login_path.trim_end_matches('/')
}

fn touches_api(gate: &GateConfig, path: &str) -> bool {
    let api = gate.api_prefix.trim_end_matches('/');
    path.ends_with(api) || path.contains(&format!("{}/", api))
}

/// Login URL carrying the page the caller wanted
pub fn login_redirect(gate: &GateConfig, original_path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", original_path)
        .finish();
    format!("{}?{}", gate.login_path, query)
}

/// First token found, in order: auth cookie, bearer header, `token` query parameter
pub fn discover_token(
    gate: &GateConfig,
    headers: &HeaderMap,
    query: Option<&str>,
    allow_query: bool,
) -> Option<(String, TokenCarrier)> {
    if let Some(token) = read_cookie(headers, &gate.cookie_name) {
        return Some((token, TokenCarrier::Cookie));
    }

    if let Ok(token) = extract_bearer(headers) {
        return Some((token, TokenCarrier::Header));
    }

    if allow_query {
        let token = query.and_then(|q| {
            form_urlencoded::parse(q.as_bytes())
                .find(|(key, value)| key == "token" && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        });
        if let Some(token) = token {
            return Some((token, TokenCarrier::Query));
        }
    }

    None
}

/// Run the gate for one request without touching the response
pub async fn evaluate_gate(
    state: &AppState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    query: Option<&str>,
) -> GateDecision {
    let gate = &state.config.gate;
    if !is_gated(gate, path) {
        return GateDecision::Bypass;
    }

    let deny = |reason: DenyReason| GateDecision::Redirect {
        location: login_redirect(gate, path),
        reason,
    };

    let allow_query =
        state.config.security.allow_query_token && (method == Method::GET || method == Method::HEAD);

    let Some((token, carrier)) = discover_token(gate, headers, query, allow_query) else {
        audit::record(AuditEvent::MissingToken, None, path);
        return deny(DenyReason::NoToken);
    };

    let claims = match state.tokens.verify(&token).await {
        Ok(claims) => claims,
        Err(e) => {
            audit::record(AuditEvent::InvalidToken, None, &format!("{} via {:?} on {}", e, carrier, path));
            let reason = match e {
                AuthError::InvalidToken(reason) => reason,
                _ => InvalidTokenReason::Malformed,
            };
            return deny(DenyReason::InvalidToken(reason));
        }
    };

    if !state.resolver.is_admin(&claims).await {
        audit::record(AuditEvent::PrivilegeDenied, Some(&claims.sub), path);
        return deny(DenyReason::NotAdmin);
    }

    if state.config.security.enable_audit_logging {
        audit::record(AuditEvent::AdminAccess, Some(&claims.sub), path);
    }

    GateDecision::Forward { token, carrier, claims }
}

/// Axum adapter around `evaluate_gate`; layer it over the whole router
pub async fn admin_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let headers = request.headers().clone();

    let decision = evaluate_gate(&state, &method, &path, &headers, query.as_deref()).await;

    match decision {
        GateDecision::Bypass => next.run(request).await,
        GateDecision::Redirect { location, reason } => {
            tracing::debug!("Gate redirecting {} to login: {:?}", path, reason);
            Redirect::to(&location).into_response()
        }
        GateDecision::Forward { token, carrier, claims } => {
            request.extensions_mut().insert(AuthUser::from(claims));
            let mut response = next.run(request).await;

            let cookie = auth_cookie(&state.config.gate, &token, state.secure_cookies());
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(_) => tracing::warn!("Token from {:?} is not a valid cookie value; not re-homed", carrier),
            }
            response
        }
    }
}
