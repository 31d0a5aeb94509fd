// handlers/pages.rs - HTML pages under the protected prefix
//
// The login page sits outside the gate; the admin shell is only reached
// through admin_gate_middleware, which puts the caller in the extensions.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension,
};
use serde::Deserialize;

use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// GET /admin/login - sign-in form that returns to `next` afterwards
pub async fn login_page(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Html<String> {
    let next = safe_next(query.next.as_deref(), &state.config.gate.protected_prefix);

    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<form id="signin" data-next="{next}">
  <label>Email <input name="email" type="email" required></label>
  <label>Password <input name="password" type="password" required></label>
  <button type="submit">Sign in</button>
  <p id="error" hidden></p>
</form>
<script>
document.getElementById("signin").addEventListener("submit", async (event) => {{
  event.preventDefault();
  const form = event.target;
  const response = await fetch("{api}/auth/signin", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    credentials: "same-origin",
    body: JSON.stringify({{ email: form.email.value, password: form.password.value }}),
  }});
  if (response.ok) {{
    window.location.assign(form.dataset.next);
  }} else {{
    const error = document.getElementById("error");
    error.textContent = "Invalid email or password";
    error.hidden = false;
  }}
}});
</script>
</body>
</html>
"#,
        next = escape_html(&next),
        api = escape_html(state.config.gate.api_prefix.trim_end_matches('/')),
    ))
}

/// GET /admin and /admin/*rest - admin shell
///
/// Only the gate's forward puts an `AuthUser` here. Paths the gate lets through
/// untouched (API-shaped paths under the prefix) get a 404, never the shell.
pub async fn admin_shell(user: Option<Extension<AuthUser>>) -> Response {
    let Some(Extension(user)) = user else {
        return StatusCode::NOT_FOUND.into_response();
    };

    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Admin</title></head>
<body>
<h1>Admin</h1>
<p>Signed in as {}</p>
<div id="app"></div>
</body>
</html>
"#,
        escape_html(&user.email)
    ))
    .into_response()
}

/// Only same-site paths under the protected prefix are followed after login
fn safe_next(next: Option<&str>, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && (next == prefix || next.starts_with(&format!("{}/", prefix))) =>
        {
            next.to_string()
        }
        _ => prefix.to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
