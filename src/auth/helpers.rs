//! Pure helper functions for the Okta adapter
//!
//! This module contains stateless helper functions for endpoint discovery,
//! URL building, cookie formatting and extraction, and HTTP clients.

use axum::http::HeaderMap;
use std::time::Duration;

use crate::config::Config;

// =============================================================================
// Cookie Names
// =============================================================================

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const ACCESS_EXPIRES_COOKIE: &str = "access_token_expires_at";
pub const ID_TOKEN_COOKIE: &str = "id_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const STATE_COOKIE: &str = "oauth_state";
pub const PKCE_COOKIE: &str = "oauth_pkce";

/// Every cookie that holds part of the token store
pub const TOKEN_COOKIES: &[&str] = &[
    ACCESS_TOKEN_COOKIE,
    ACCESS_EXPIRES_COOKIE,
    ID_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
];

/// Lifetime of the state/PKCE cookies spanning one redirect round trip
pub const TRANSIENT_COOKIE_MAX_AGE_SECS: u64 = 600;

/// Largest cookie browsers are required to keep; bigger ones are dropped silently
pub const MAX_COOKIE_BYTES: usize = 4096;

// =============================================================================
// Okta Endpoints
// =============================================================================

/// OAuth2/OIDC endpoints of an Okta authorization server
#[derive(Debug, Clone, PartialEq)]
pub struct OktaEndpoints {
    pub authorize: String,
    pub token: String,
    pub keys: String,
    pub logout: String,
}

impl OktaEndpoints {
    /// Derive endpoints from the issuer.
    ///
    /// A bare org domain (`https://dev-1.okta.com`) uses the org authorization
    /// server under `/oauth2/v1`; an issuer that already names a custom
    /// authorization server (`.../oauth2/default`) uses `/v1` below it.
    pub fn for_issuer(issuer: &str) -> Self {
        let issuer = issuer.trim_end_matches('/');
        let base = if issuer.contains("/oauth2/") {
            format!("{}/v1", issuer)
        } else {
            format!("{}/oauth2/v1", issuer)
        };

        Self {
            authorize: format!("{}/authorize", base),
            token: format!("{}/token", base),
            keys: format!("{}/keys", base),
            logout: format!("{}/logout", base),
        }
    }
}

/// Build the Okta logout URL.
///
/// Okta requires `id_token_hint` to end the provider session, so there is no
/// client_id fallback: callers without a hint must navigate locally instead.
pub fn build_okta_logout_url(
    logout_endpoint: &str,
    id_token_hint: &str,
    post_logout_redirect_uri: &str,
) -> String {
    format!(
        "{}?id_token_hint={}&post_logout_redirect_uri={}",
        logout_endpoint,
        urlencoding::encode(id_token_hint),
        urlencoding::encode(post_logout_redirect_uri)
    )
}

// =============================================================================
// Cookie Formatting
// =============================================================================

/// Format a Set-Cookie value for an HttpOnly portal cookie.
///
/// `max_age: None` produces a session cookie.
pub fn build_cookie(config: &Config, name: &str, value: &str, max_age: Option<u64>) -> String {
    let max_age_attr = match max_age {
        Some(secs) => format!("; Max-Age={}", secs),
        None => String::new(),
    };
    format!(
        "{}={}; HttpOnly; Path=/{}; SameSite=Lax{}{}",
        name,
        value,
        max_age_attr,
        config.cookie_domain_attr(),
        config.cookie_secure_flag()
    )
}

/// Format a Set-Cookie value that deletes `name`
pub fn build_clear_cookie(config: &Config, name: &str) -> String {
    build_cookie(config, name, "", Some(0))
}

/// Whether a Set-Cookie value (name, value and attributes) is past the browser limit
pub fn exceeds_cookie_limit(cookie: &str) -> bool {
    cookie.len() > MAX_COOKIE_BYTES
}

// =============================================================================
// Cookie Extraction
// =============================================================================

/// Extract a cookie value from headers
///
/// Handles multiple Cookie headers (some proxies fold/duplicate headers).
/// Uses `get_all` to collect all Cookie header values.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);

    // Iterate over all Cookie headers (proxies may send multiple)
    for header_value in headers.get_all("cookie") {
        if let Ok(cookie_str) = header_value.to_str() {
            if let Some(value) = cookie_str
                .split(';')
                .map(|c| c.trim())
                .find(|c| c.starts_with(&prefix))
                .and_then(|c| c.strip_prefix(&prefix))
            {
                return Some(value.to_string());
            }
        }
    }
    None
}

// =============================================================================
// HTTP Client Builders
// =============================================================================

/// Create a reqwest client for OAuth2 HTTP requests using config timeouts
pub fn create_http_client(
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none()) // Security: prevent SSRF
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()
}

/// Current time as unix seconds
pub fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_org_authorization_server_endpoints() {
        let endpoints = OktaEndpoints::for_issuer("https://dev-12345.okta.com/");
        assert_eq!(
            endpoints.authorize,
            "https://dev-12345.okta.com/oauth2/v1/authorize"
        );
        assert_eq!(endpoints.token, "https://dev-12345.okta.com/oauth2/v1/token");
        assert_eq!(endpoints.keys, "https://dev-12345.okta.com/oauth2/v1/keys");
        assert_eq!(endpoints.logout, "https://dev-12345.okta.com/oauth2/v1/logout");
    }

    #[test]
    fn test_custom_authorization_server_endpoints() {
        let endpoints = OktaEndpoints::for_issuer("https://acme.okta.com/oauth2/default");
        assert_eq!(
            endpoints.authorize,
            "https://acme.okta.com/oauth2/default/v1/authorize"
        );
        assert_eq!(endpoints.keys, "https://acme.okta.com/oauth2/default/v1/keys");
    }

    #[test]
    fn test_build_okta_logout_url() {
        let url = build_okta_logout_url(
            "https://dev-12345.okta.com/oauth2/v1/logout",
            "eyJ.abc.def",
            "http://localhost:9000/",
        );
        assert!(url.starts_with("https://dev-12345.okta.com/oauth2/v1/logout?id_token_hint=eyJ.abc.def"));
        // Verify URL encoding
        assert!(url.contains("post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A9000%2F"));
    }

    #[test]
    fn test_build_cookie_persistent_and_session() {
        let dev = config(&[]);
        assert_eq!(
            build_cookie(&dev, "access_token", "abc", Some(3600)),
            "access_token=abc; HttpOnly; Path=/; Max-Age=3600; SameSite=Lax"
        );
        assert_eq!(
            build_cookie(&dev, "access_token", "abc", None),
            "access_token=abc; HttpOnly; Path=/; SameSite=Lax"
        );

        let prod = config(&[("ENVIRONMENT", "production"), ("COOKIE_DOMAIN", "example.com")]);
        assert_eq!(
            build_clear_cookie(&prod, "id_token"),
            "id_token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax; Domain=example.com; Secure"
        );
    }

    #[test]
    fn test_extract_cookie_finds_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            axum::http::HeaderValue::from_static("foo=bar; id_token=abc123; baz=qux"),
        );

        let result = extract_cookie(&headers, "id_token");
        assert_eq!(result, Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_cookie_missing_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            axum::http::HeaderValue::from_static("foo=bar; baz=qux"),
        );

        let result = extract_cookie(&headers, "id_token");
        assert_eq!(result, None);
    }

    #[test]
    fn test_extract_cookie_no_cookie_header() {
        let headers = HeaderMap::new();
        let result = extract_cookie(&headers, "id_token");
        assert_eq!(result, None);
    }

    #[test]
    fn test_extract_cookie_multiple_headers() {
        // Some proxies send multiple Cookie headers instead of one combined header
        let mut headers = HeaderMap::new();
        headers.append("cookie", axum::http::HeaderValue::from_static("foo=bar"));
        headers.append(
            "cookie",
            axum::http::HeaderValue::from_static("access_token=tok; oauth_state=xyz"),
        );

        assert_eq!(extract_cookie(&headers, "oauth_state"), Some("xyz".to_string()));
        assert_eq!(extract_cookie(&headers, "access_token"), Some("tok".to_string()));
    }

    #[test]
    fn test_extract_cookie_does_not_match_prefix_names() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            axum::http::HeaderValue::from_static("access_token_expires_at=99"),
        );
        assert_eq!(extract_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_oversized_id_token_cookie_is_detected() {
        let config = config(&[]);
        let small = build_cookie(&config, ID_TOKEN_COOKIE, "eyJ.a.b", Some(3600));
        assert!(!exceeds_cookie_limit(&small));

        // An ID token carrying a few hundred group names
        let large_value = "g".repeat(MAX_COOKIE_BYTES);
        let large = build_cookie(&config, ID_TOKEN_COOKIE, &large_value, Some(3600));
        assert!(exceeds_cookie_limit(&large));
    }
}
