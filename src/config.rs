use std::env;

use crate::session::CALLBACK_RETRY_DELAY;

/// Issuer value shipped in the sample configuration. Seeing it means the
/// operator has not pointed the portal at a real Okta org yet.
pub const PLACEHOLDER_ISSUER: &str = "https://YOUR_OKTA_DOMAIN";

/// Client id value shipped in the sample configuration.
pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_CLIENT_ID";

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

/// Where issued tokens are kept between page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStorage {
    /// Durable cookies that outlive the browser session (`localStorage` semantics)
    Persistent,
    /// Session cookies dropped when the browser closes (`sessionStorage` semantics)
    Session,
}

impl TokenStorage {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "sessionstorage" | "session" => TokenStorage::Session,
            _ => TokenStorage::Persistent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environment configuration
    pub environment: Environment,

    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Okta application configuration
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    pub scopes: Vec<String>,
    pub pkce: bool,
    pub token_storage: TokenStorage,

    // Cookie configuration (None = host-only cookie, Some = domain cookie)
    pub cookie_domain: Option<String>,

    // HTTP client timeout configuration (in seconds)
    pub http_connect_timeout_secs: u64,
    pub http_request_timeout_secs: u64,

    // JWKS cache configuration (in seconds)
    pub jwks_cache_ttl_secs: u64,

    // Tokens are treated as expired this many seconds before their exp
    pub token_expire_early_secs: u64,

    // Delay before re-attempting sign-in after a failed callback
    pub callback_retry_delay_ms: u64,

    // How often the application shell asks the portal to renew tokens
    pub token_renew_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables using std::env::var
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Missing Okta settings fall back to the placeholders rather than failing,
    /// so an unconfigured portal still starts and renders setup instructions.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("{} must be a number: {}", key, e)),
                None => Ok(default),
            }
        };

        let environment = match var("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        // Issuer is the bare Okta domain or a custom authorization server URL
        let issuer = var("OKTA_ISSUER")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| PLACEHOLDER_ISSUER.to_string());

        let client_id = var("OKTA_CLIENT_ID")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| PLACEHOLDER_CLIENT_ID.to_string());

        let client_secret = var("OKTA_CLIENT_SECRET");

        let redirect_uri =
            var("REDIRECT_URI").unwrap_or_else(|| "http://localhost:9000/".to_string());
        url::Url::parse(&redirect_uri)
            .map_err(|e| anyhow::anyhow!("REDIRECT_URI is not a valid URL: {}", e))?;

        let post_logout_redirect_uri =
            var("POST_LOGOUT_REDIRECT_URI").unwrap_or_else(|| redirect_uri.clone());

        let scopes = var("OKTA_SCOPES")
            .map(|raw| parse_scopes(&raw))
            .filter(|scopes| !scopes.is_empty())
            .unwrap_or_else(|| {
                ["openid", "profile", "email"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let pkce = var("OKTA_PKCE")
            .map(|s| !matches!(s.trim().to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        let token_storage = var("TOKEN_STORAGE")
            .map(|s| TokenStorage::parse(&s))
            .unwrap_or(TokenStorage::Persistent);

        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = var("SERVER_PORT")
            .map(|s| {
                s.trim()
                    .parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("SERVER_PORT must be a port number: {}", e))
            })
            .transpose()?
            .unwrap_or(9000);

        // Cookie domain: if not set or empty, use host-only cookies (no Domain attribute)
        let cookie_domain = var("COOKIE_DOMAIN");

        Ok(Config {
            environment,
            server_host,
            server_port,
            issuer,
            client_id,
            client_secret,
            redirect_uri,
            post_logout_redirect_uri,
            scopes,
            pkce,
            token_storage,
            cookie_domain,
            http_connect_timeout_secs: number("HTTP_CONNECT_TIMEOUT_SECS", 10)?,
            http_request_timeout_secs: number("HTTP_REQUEST_TIMEOUT_SECS", 30)?,
            jwks_cache_ttl_secs: number("JWKS_CACHE_TTL_SECS", 3600)?,
            token_expire_early_secs: number("TOKEN_EXPIRE_EARLY_SECS", 30)?,
            callback_retry_delay_ms: number(
                "CALLBACK_RETRY_DELAY_MS",
                CALLBACK_RETRY_DELAY.as_millis() as u64,
            )?,
            token_renew_interval_secs: number("TOKEN_RENEW_INTERVAL_SECS", 300)?,
        })
    }

    /// True once both the issuer and the client id differ from the shipped placeholders
    pub fn is_configured(&self) -> bool {
        self.issuer != PLACEHOLDER_ISSUER && self.client_id != PLACEHOLDER_CLIENT_ID
    }

    /// Origin (scheme, host, port) of the redirect URI, shown in setup instructions
    pub fn origin(&self) -> String {
        url::Url::parse(&self.redirect_uri)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| self.redirect_uri.clone())
    }

    /// Path component of the redirect URI; the visible URL is reset to it after a callback
    pub fn callback_path(&self) -> String {
        url::Url::parse(&self.redirect_uri)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get cookie security flags based on environment
    pub fn cookie_secure_flag(&self) -> &str {
        if self.is_production() {
            "; Secure"
        } else {
            ""
        }
    }

    /// Get cookie domain attribute string (empty if host-only cookie)
    pub fn cookie_domain_attr(&self) -> String {
        match &self.cookie_domain {
            Some(domain) => format!("; Domain={}", domain),
            None => String::new(),
        }
    }

    /// Seconds before expiry at which a renewal poll refreshes the access token.
    ///
    /// Spans one poll interval so the next poll can never arrive after expiry.
    pub fn renewal_window_secs(&self) -> u64 {
        self.token_expire_early_secs + self.token_renew_interval_secs
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Split a scope list on whitespace or commas, dropping duplicates
fn parse_scopes(raw: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for scope in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if !scope.is_empty() && !scopes.iter().any(|s| s == scope) {
            scopes.push(scope.to_string());
        }
    }
    scopes
}
