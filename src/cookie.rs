//! Session cookie contract
//!
//! The session gate accepts a token from the `Authorization` header or
//! from a cookie. This module carries the cookie side of that contract:
//! the attributes a session cookie must be written with (`HttpOnly`,
//! `Secure`, `SameSite=Strict`, explicit `Path`, `Domain` when
//! configured) and the expired empty-valued replacement written on
//! logout. Host-application login/logout handlers render the header
//! values; the gate only reads them.
//!
//! # Usage
//!
//! ```ignore
//! use axum::http::header::SET_COOKIE;
//!
//! // In a login handler, after AuthService::login succeeds:
//! let value = config.cookie.issue(token.as_str(), config.session_ttl);
//! response.headers_mut().insert(SET_COOKIE, value.parse()?);
//!
//! // In a logout handler:
//! let value = config.cookie.clear();
//! response.headers_mut().insert(SET_COOKIE, value.parse()?);
//! ```

use std::time::Duration;

use axum::http::{header, HeaderMap};

/// Attributes of the session cookie.
///
/// Defaults match the protocol contract: `HttpOnly` always, `Secure`
/// unless explicitly disabled for local development, `SameSite=Strict`,
/// path `/`, no domain restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Cookie name the token travels under
    pub name: String,
    /// Cookie path attribute
    pub path: String,
    /// Cookie domain attribute; omitted when `None`
    pub domain: Option<String>,
    /// Whether to set the `Secure` attribute
    pub secure: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            name: "auth_token".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
        }
    }
}

impl CookiePolicy {
    /// Create the policy from environment variables.
    ///
    /// - `SESSION_COOKIE_NAME` (default: "auth_token")
    /// - `SESSION_COOKIE_PATH` (default: "/")
    /// - `SESSION_COOKIE_DOMAIN` (default: unset)
    /// - `SESSION_COOKIE_SECURE`: "true"/"false" (default: "true")
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let name = std::env::var("SESSION_COOKIE_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.name);

        let path = std::env::var("SESSION_COOKIE_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.path);

        let domain = std::env::var("SESSION_COOKIE_DOMAIN")
            .ok()
            .filter(|s| !s.is_empty());

        let secure = std::env::var("SESSION_COOKIE_SECURE")
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            name,
            path,
            domain,
            secure,
        }
    }

    /// Render the `Set-Cookie` value carrying a fresh session token.
    ///
    /// `max_age` is normally the configured session TTL, so the browser
    /// forgets the cookie around the time the store forgets the session.
    pub fn issue(&self, token: &str, max_age: Duration) -> String {
        let mut value = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name,
            token,
            self.path,
            max_age.as_secs()
        );
        if let Some(domain) = &self.domain {
            value.push_str("; Domain=");
            value.push_str(domain);
        }
        value.push_str("; HttpOnly");
        if self.secure {
            value.push_str("; Secure");
        }
        value.push_str("; SameSite=Strict");
        value
    }

    /// Render the `Set-Cookie` value that clears the session cookie.
    ///
    /// Written on logout: empty value, `Max-Age=0`, same attributes as
    /// issuance so the browser matches the cookie being replaced.
    pub fn clear(&self) -> String {
        self.issue("", Duration::ZERO)
    }

    /// Extract the session token from a request's `Cookie` header.
    ///
    /// Returns `None` when the header is absent, unreadable, or does
    /// not carry a cookie under the configured name.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(header::COOKIE)?.to_str().ok()?;

        raw.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name == self.name && !value.is_empty() {
                Some(value.to_string())
            } else {
                None
            }
        })
    }
}
