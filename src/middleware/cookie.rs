use axum::http::{header, HeaderMap};

use crate::config::GateConfig;

/// Value of the first cookie called `name` across all `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that stores the auth token for the whole site
pub fn auth_cookie(gate: &GateConfig, token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax; HttpOnly",
        gate.cookie_name, token, gate.cookie_max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the auth cookie
pub fn clear_auth_cookie(gate: &GateConfig, secure: bool) -> String {
    let mut cookie = format!("{}=; Path=/; Max-Age=0; SameSite=Lax; HttpOnly", gate.cookie_name);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
