use std::sync::Arc;

use url::{form_urlencoded, Url};

use super::{PropagationError, TokenStore};
use crate::config::GateConfig;

/// Threads the stored token into navigations under the protected prefix
pub struct TokenPropagator {
    store: Arc<TokenStore>,
    protected_prefix: String,
    login_path: String,
    query_fallback: bool,
}

impl TokenPropagator {
    /// With `query_fallback` off every rewrite returns its input and the
    /// cookie jar is the only carrier.
    pub fn new(store: Arc<TokenStore>, gate: &GateConfig, query_fallback: bool) -> Self {
        Self {
            store,
            protected_prefix: gate.protected_prefix.trim_end_matches('/').to_string(),
            login_path: gate.login_path.trim_end_matches('/').to_string(),
            query_fallback,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Under the prefix and not the login page
    pub fn is_protected(&self, path: &str) -> bool {
        let under = path == self.protected_prefix || path.starts_with(&format!("{}/", self.protected_prefix));
        under && path.trim_end_matches('/') != self.login_path
    }

    /// URL to move to after a route change, or `None` to stay put
    pub fn on_route_change(&self, current: &Url) -> Option<Url> {
        if !self.query_fallback || !self.is_protected(current.path()) || has_token_param(current) {
            return None;
        }
        let token = self.token()?;
        Some(with_token(current, &token))
    }

    /// Absolute URL for a full-page navigation to `target_path`
    pub fn navigation_url(&self, target_path: &str) -> Result<Url, PropagationError> {
        let url = self.store.base_url().join(target_path)?;
        if !self.query_fallback || !self.is_protected(url.path()) || has_token_param(&url) {
            return Ok(url);
        }
        Ok(match self.token() {
            Some(token) => with_token(&url, &token),
            None => url,
        })
    }

    /// Add the token to every `href` pointing under the prefix
    pub fn rewrite_links(&self, html: &str) -> String {
        if !self.query_fallback {
            return html.to_string();
        }
        let Some(token) = self.token() else {
            return html.to_string();
        };

        let mut out = String::with_capacity(html.len());
        let mut rest = html;

        while let Some(start) = find_href(rest) {
            let (before, after) = rest.split_at(start);
            out.push_str(before);

            let mut chars = after.chars();
            let quote = match chars.next() {
                Some(q @ ('"' | '\'')) => q,
                _ => {
                    rest = after;
                    continue;
                }
            };
            let Some(end) = after[1..].find(quote) else {
                rest = after;
                break;
            };

            let href = &after[1..1 + end];
            out.push(quote);
            if self.should_rewrite(href) {
                out.push_str(&append_token(href, &token));
            } else {
                out.push_str(href);
            }
            out.push(quote);
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }

    fn should_rewrite(&self, href: &str) -> bool {
        if !href.starts_with('/') || href.starts_with("//") {
            return false;
        }
        let path = href.split(['?', '#']).next().unwrap_or(href);
        let query = href.split('#').next().and_then(|h| h.split_once('?')).map(|(_, q)| q);
        let already = query
            .map(|q| form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == "token"))
            .unwrap_or(false);
        self.is_protected(path) && !already
    }

    /// Agreed token; a divergence is repaired from the session file first
    fn token(&self) -> Option<String> {
        match self.store.current() {
            Ok(token) => token,
            Err(PropagationError::Diverged) => {
                tracing::warn!("Token tiers diverged; resyncing from {}", self.store.path().display());
                self.store.resync().unwrap_or_else(|e| {
                    tracing::warn!("Token resync failed: {}", e);
                    None
                })
            }
            Err(e) => {
                tracing::warn!("Token store unreadable: {}", e);
                None
            }
        }
    }
}

/// Byte offset of the next `href` attribute's value (case-insensitive).
/// The name must stand alone, so `data-href` is skipped, and whitespace
/// around `=` is allowed.
fn find_href(html: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let skip_space = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        i
    };

    let mut from = 0;
    while let Some(found) = lower[from..].find("href") {
        let name = from + found;
        from = name + "href".len();

        if name > 0 && !bytes[name - 1].is_ascii_whitespace() {
            continue;
        }
        let eq = skip_space(from);
        if bytes.get(eq) == Some(&b'=') {
            return Some(skip_space(eq + 1));
        }
    }
    None
}

fn has_token_param(url: &Url) -> bool {
    url.query_pairs().any(|(key, _)| key == "token")
}

fn with_token(url: &Url, token: &str) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut().append_pair("token", token);
    url
}

fn append_token(href: &str, token: &str) -> String {
    let (base, fragment) = match href.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (href, None),
    };
    let pair = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", token)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };

    let mut out = format!("{}{}{}", base, separator, pair);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
