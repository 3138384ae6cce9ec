//! Okta-backed identity client
//!
//! `OktaProvider` holds everything that lives for the whole process (OAuth
//! client, HTTP client, JWKS cache). `OktaIdentityClient` is built per page
//! load from the request's query and cookies; tokens live in HttpOnly cookies
//! and every store mutation is queued as a `Set-Cookie` value.

use oauth2::{
    basic::{BasicErrorResponseType, BasicTokenType},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointSet, ExtraTokenFields,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    StandardErrorResponse, StandardRevocableToken, StandardTokenIntrospectionResponse,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::helpers::{
    build_clear_cookie, build_cookie, build_okta_logout_url, create_http_client,
    exceeds_cookie_limit, extract_cookie, now_unix, OktaEndpoints, ACCESS_EXPIRES_COOKIE,
    ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, MAX_COOKIE_BYTES, PKCE_COOKIE, REFRESH_TOKEN_COOKIE,
    STATE_COOKIE, TOKEN_COOKIES, TRANSIENT_COOKIE_MAX_AGE_SECS,
};
use super::jwt::{IdTokenValidator, VerifiedIdToken};
use crate::config::{Config, TokenStorage};
use crate::session::{
    AuthError, IdentityClient, SignInOptions, SignOutOptions, Token, TokenEvent, TokenKind,
    TokenSet,
};

/// Refresh tokens outlive the access token; Okta's default refresh lifetime is unbounded
const REFRESH_COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 3600;

/// Access token lifetime assumed when the token response omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

const EVENT_CAPACITY: usize = 16;

// =============================================================================
// Types
// =============================================================================

/// Custom extra fields to capture id_token from OIDC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcTokenFields {
    pub id_token: Option<String>,
}

impl ExtraTokenFields for OidcTokenFields {}

type OidcTokenResponse = StandardTokenResponse<OidcTokenFields, BasicTokenType>;

/// Type alias for our configured OAuth client with OIDC support
type ConfiguredOAuthClient = oauth2::Client<
    StandardErrorResponse<BasicErrorResponseType>,
    OidcTokenResponse,
    StandardTokenIntrospectionResponse<OidcTokenFields, BasicTokenType>,
    StandardRevocableToken,
    StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    EndpointSet,            // HasAuthUrl
    oauth2::EndpointNotSet, // HasDeviceAuthUrl
    oauth2::EndpointNotSet, // HasIntrospectionUrl
    oauth2::EndpointNotSet, // HasRevocationUrl
    EndpointSet,            // HasTokenUrl
>;

/// Authorization response parameters as they arrive on the redirect URI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Side effects a page load has to ship back to the browser
#[derive(Debug, Default)]
pub struct ClientEffects {
    pub set_cookies: Vec<String>,
    pub navigation: Option<String>,
}

// =============================================================================
// Provider
// =============================================================================

/// Initialize OAuth2 client for the Okta authorization server
fn create_oauth_client(
    endpoints: &OktaEndpoints,
    client_id: &str,
    client_secret: Option<&str>,
    redirect_uri: &str,
) -> Result<ConfiguredOAuthClient, String> {
    let auth_url = AuthUrl::new(endpoints.authorize.clone())
        .map_err(|e| format!("Invalid auth URL: {}", e))?;
    let token_url = TokenUrl::new(endpoints.token.clone())
        .map_err(|e| format!("Invalid token URL: {}", e))?;
    let redirect_url = RedirectUrl::new(redirect_uri.to_string())
        .map_err(|e| format!("Invalid redirect URL: {}", e))?;

    let mut client = oauth2::Client::new(ClientId::new(client_id.to_string()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url);

    // Public SPA-style clients rely on PKCE alone
    if let Some(secret) = client_secret {
        client = client.set_client_secret(ClientSecret::new(secret.to_string()));
    }

    Ok(client)
}

/// Process-wide Okta state shared by every page load
pub struct OktaProvider {
    config: Arc<Config>,
    endpoints: OktaEndpoints,
    oauth_client: ConfiguredOAuthClient,
    http_client: reqwest::Client,
    validator: IdTokenValidator,
}

impl OktaProvider {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let endpoints = OktaEndpoints::for_issuer(&config.issuer);

        let oauth_client = create_oauth_client(
            &endpoints,
            &config.client_id,
            config.client_secret.as_deref(),
            &config.redirect_uri,
        )
        .map_err(|e| anyhow::anyhow!("Failed to create OAuth client: {}", e))?;

        let http_client = create_http_client(
            config.http_connect_timeout_secs,
            config.http_request_timeout_secs,
        )
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        let validator = IdTokenValidator::new(
            endpoints.keys.clone(),
            &config.issuer,
            config.client_id.clone(),
            http_client.clone(),
            config.jwks_cache_ttl_secs,
        );

        tracing::info!(
            authorize_url = %endpoints.authorize,
            pkce = config.pkce,
            confidential = config.client_secret.is_some(),
            "Okta provider initialized"
        );

        Ok(Self {
            config,
            endpoints,
            oauth_client,
            http_client,
            validator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn endpoints(&self) -> &OktaEndpoints {
        &self.endpoints
    }

    pub fn validator(&self) -> &IdTokenValidator {
        &self.validator
    }
}

// =============================================================================
// Per-request client
// =============================================================================

#[derive(Default)]
struct CookieStore {
    access_token: Option<String>,
    access_expires_at: Option<i64>,
    id_token: Option<String>,
    /// Claims verified earlier in this page load, keyed implicitly by `id_token`
    verified_id: Option<VerifiedIdToken>,
    refresh_token: Option<String>,
}

/// Round-trip values written before the sign-in redirect
#[derive(Default)]
struct RedirectCookies {
    state: Option<String>,
    pkce_verifier: Option<String>,
}

pub struct OktaIdentityClient {
    provider: Arc<OktaProvider>,
    params: CallbackParams,
    redirect: RedirectCookies,
    store: Mutex<CookieStore>,
    effects: Mutex<ClientEffects>,
    events: broadcast::Sender<TokenEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn token_error<RE>(err: RequestTokenError<RE, StandardErrorResponse<BasicErrorResponseType>>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => {
            let code = response.error().as_ref().to_string();
            let message = response
                .error_description()
                .cloned()
                .unwrap_or_else(|| code.clone());
            AuthError::with_code(code, message)
        }
        other => AuthError::new(format!("Token request failed: {}", other)),
    }
}

impl OktaIdentityClient {
    pub fn from_request(
        provider: Arc<OktaProvider>,
        headers: &axum::http::HeaderMap,
        params: CallbackParams,
    ) -> Self {
        let store = CookieStore {
            access_token: extract_cookie(headers, ACCESS_TOKEN_COOKIE).filter(|v| !v.is_empty()),
            access_expires_at: extract_cookie(headers, ACCESS_EXPIRES_COOKIE)
                .and_then(|v| v.parse::<i64>().ok()),
            id_token: extract_cookie(headers, ID_TOKEN_COOKIE).filter(|v| !v.is_empty()),
            verified_id: None,
            refresh_token: extract_cookie(headers, REFRESH_TOKEN_COOKIE).filter(|v| !v.is_empty()),
        };
        let redirect = RedirectCookies {
            state: extract_cookie(headers, STATE_COOKIE).filter(|v| !v.is_empty()),
            pkce_verifier: extract_cookie(headers, PKCE_COOKIE).filter(|v| !v.is_empty()),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            provider,
            params,
            redirect,
            store: Mutex::new(store),
            effects: Mutex::new(ClientEffects::default()),
            events,
        }
    }

    fn config(&self) -> &Config {
        self.provider.config()
    }

    /// Hand over the queued cookies and navigation, leaving the queue empty
    pub fn take_effects(&self) -> ClientEffects {
        std::mem::take(&mut *lock(&self.effects))
    }

    fn push_cookie(&self, cookie: String) {
        lock(&self.effects).set_cookies.push(cookie);
    }

    fn navigate(&self, url: String) {
        lock(&self.effects).navigation = Some(url);
    }

    fn publish(&self, event: TokenEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("No renewal subscribers for token event");
        }
    }

    /// Cookie lifetime for a token expiring at `expires_at`, per storage mode
    fn max_age_until(&self, expires_at: i64) -> Option<u64> {
        match self.config().token_storage {
            TokenStorage::Persistent => Some((expires_at - now_unix()).max(0) as u64),
            TokenStorage::Session => None,
        }
    }

    fn refresh_max_age(&self) -> Option<u64> {
        match self.config().token_storage {
            TokenStorage::Persistent => Some(REFRESH_COOKIE_MAX_AGE_SECS),
            TokenStorage::Session => None,
        }
    }

    async fn token_set_from_response(&self, response: &OidcTokenResponse) -> Result<TokenSet, AuthError> {
        let expires_in = response
            .expires_in()
            .map(|d| d.as_secs())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        let access_token = Token {
            kind: TokenKind::Access,
            value: response.access_token().secret().clone(),
            expires_at: now_unix() + expires_in as i64,
            claims: None,
        };

        let id_token = match response.extra_fields().id_token.as_deref() {
            Some(raw) => {
                let verified = self
                    .provider
                    .validator()
                    .validate(raw)
                    .await
                    .map_err(|e| AuthError::with_code("invalid_token", e.to_string()))?;
                Some(Token {
                    kind: TokenKind::Id,
                    value: raw.to_string(),
                    expires_at: verified.expires_at,
                    claims: Some(verified.claims),
                })
            }
            None => {
                tracing::warn!("No id_token received from Okta");
                None
            }
        };

        let refresh_token = response.refresh_token().map(|t| Token {
            kind: TokenKind::Refresh,
            value: t.secret().clone(),
            expires_at: i64::MAX,
            claims: None,
        });

        Ok(TokenSet {
            access_token: Some(access_token),
            id_token,
            refresh_token,
        })
    }

    /// Renew the access token with the stored refresh token once it is due.
    ///
    /// A token is due when it expires within the renewal window, so it is
    /// replaced before the next poll rather than after it has lapsed. The
    /// outcome is published to subscribers.
    pub async fn renew_tokens(&self) {
        let window = self.config().renewal_window_secs() as i64;
        let (renewal_due, refresh) = {
            let store = lock(&self.store);
            let renewal_due = match (&store.access_token, store.access_expires_at) {
                (Some(_), Some(expires_at)) => expires_at - window <= now_unix(),
                _ => true,
            };
            (renewal_due, store.refresh_token.clone())
        };

        if !renewal_due {
            tracing::debug!(window_secs = window, "Access token outside renewal window");
            return;
        }

        let Some(refresh) = refresh else {
            self.publish(TokenEvent::Error(AuthError::with_code(
                "login_required",
                "No refresh token available; sign-in required",
            )));
            return;
        };

        tracing::info!("Renewing tokens with refresh token");
        let result = self
            .provider
            .oauth_client
            .exchange_refresh_token(&RefreshToken::new(refresh.clone()))
            .request_async(&self.provider.http_client)
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.publish(TokenEvent::Error(token_error(e)));
                return;
            }
        };

        match self.token_set_from_response(&response).await {
            Ok(mut tokens) => {
                // Okta only rotates the refresh token when rotation is enabled
                if tokens.refresh_token.is_none() {
                    tokens.refresh_token = Some(Token {
                        kind: TokenKind::Refresh,
                        value: refresh,
                        expires_at: i64::MAX,
                        claims: None,
                    });
                }
                let kinds: Vec<TokenKind> = tokens.tokens().map(|t| t.kind).collect();
                self.set_tokens(tokens);
                for kind in kinds {
                    self.publish(TokenEvent::Renewed { kind });
                }
            }
            Err(e) => self.publish(TokenEvent::Error(e)),
        }
    }
}

impl IdentityClient for OktaIdentityClient {
    fn is_redirect_callback(&self) -> bool {
        (self.params.code.is_some() || self.params.error.is_some()) && self.params.state.is_some()
    }

    async fn parse_tokens_from_redirect(&self) -> Result<TokenSet, AuthError> {
        // The round-trip cookies are single use whatever the outcome
        self.push_cookie(build_clear_cookie(self.config(), STATE_COOKIE));
        self.push_cookie(build_clear_cookie(self.config(), PKCE_COOKIE));

        if let Some(error) = &self.params.error {
            tracing::warn!(
                error = %error,
                description = ?self.params.error_description,
                "OAuth authorization failed"
            );
            let message = self
                .params
                .error_description
                .clone()
                .unwrap_or_else(|| error.clone());
            return Err(AuthError::with_code(error.clone(), message));
        }

        // CSRF Protection: Validate state parameter matches stored cookie
        let returned_state = self
            .params
            .state
            .as_deref()
            .ok_or_else(|| AuthError::with_code("invalid_request", "Missing state parameter"))?;
        let stored_state = self.redirect.state.as_deref().ok_or_else(|| {
            AuthError::with_code("invalid_state", "CSRF validation failed: missing state cookie")
        })?;
        if returned_state != stored_state {
            tracing::warn!("CSRF validation failed: State mismatch (callback vs cookie)");
            return Err(AuthError::with_code(
                "invalid_state",
                "CSRF validation failed: state mismatch",
            ));
        }

        let code = self
            .params
            .code
            .clone()
            .ok_or_else(|| AuthError::with_code("invalid_request", "Missing authorization code"))?;

        tracing::debug!(code_length = code.len(), "Exchanging authorization code for tokens");

        let mut request = self
            .provider
            .oauth_client
            .exchange_code(AuthorizationCode::new(code));
        if self.config().pkce {
            let verifier = self.redirect.pkce_verifier.clone().ok_or_else(|| {
                AuthError::with_code("invalid_request", "Missing PKCE code verifier")
            })?;
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
        }

        let response = request
            .request_async(&self.provider.http_client)
            .await
            .map_err(|e| {
                let err = token_error(e);
                tracing::error!(error = %err, code = ?err.code, "Failed to exchange code for tokens");
                err
            })?;

        self.token_set_from_response(&response).await
    }

    fn set_tokens(&self, tokens: TokenSet) {
        let mut cookies = Vec::new();
        {
            let mut store = lock(&self.store);

            if let Some(access) = tokens.access_token {
                let max_age = self.max_age_until(access.expires_at);
                cookies.push(build_cookie(self.config(), ACCESS_TOKEN_COOKIE, &access.value, max_age));
                cookies.push(build_cookie(
                    self.config(),
                    ACCESS_EXPIRES_COOKIE,
                    &access.expires_at.to_string(),
                    max_age,
                ));
                store.access_token = Some(access.value);
                store.access_expires_at = Some(access.expires_at);
            }

            if let Some(id) = tokens.id_token {
                let max_age = self.max_age_until(id.expires_at);
                cookies.push(build_cookie(self.config(), ID_TOKEN_COOKIE, &id.value, max_age));
                store.verified_id = id.claims.map(|claims| VerifiedIdToken {
                    claims,
                    expires_at: id.expires_at,
                });
                store.id_token = Some(id.value);
            }

            if let Some(refresh) = tokens.refresh_token {
                cookies.push(build_cookie(
                    self.config(),
                    REFRESH_TOKEN_COOKIE,
                    &refresh.value,
                    self.refresh_max_age(),
                ));
                store.refresh_token = Some(refresh.value);
            }
        }

        for cookie in cookies {
            let name = cookie.split('=').next().unwrap_or_default();
            if exceeds_cookie_limit(&cookie) {
                tracing::warn!(
                    cookie = name,
                    size = cookie.len(),
                    limit = MAX_COOKIE_BYTES,
                    "Token cookie exceeds the browser size limit and will be dropped"
                );
            } else {
                tracing::debug!(cookie = name, size = cookie.len(), "Token cookie stored");
            }
            self.push_cookie(cookie);
        }
    }

    async fn get_token(&self, kind: TokenKind) -> Result<Option<Token>, AuthError> {
        match kind {
            TokenKind::Access => {
                let store = lock(&self.store);
                Ok(store.access_token.clone().map(|value| Token {
                    kind,
                    value,
                    // A missing expiry cookie means the token cannot be trusted as live
                    expires_at: store.access_expires_at.unwrap_or(0),
                    claims: None,
                }))
            }
            TokenKind::Refresh => Ok(lock(&self.store).refresh_token.clone().map(|value| Token {
                kind,
                value,
                expires_at: i64::MAX,
                claims: None,
            })),
            TokenKind::Id => {
                let (raw, cached) = {
                    let store = lock(&self.store);
                    (store.id_token.clone(), store.verified_id.clone())
                };
                let Some(raw) = raw else {
                    return Ok(None);
                };

                let verified = match cached {
                    Some(verified) => verified,
                    None => match self.provider.validator().validate(&raw).await {
                        Ok(verified) => {
                            lock(&self.store).verified_id = Some(verified.clone());
                            verified
                        }
                        Err(e) => {
                            tracing::info!(error = %e, "Stored ID token is not usable");
                            return Ok(None);
                        }
                    },
                };

                Ok(Some(Token {
                    kind,
                    value: raw,
                    expires_at: verified.expires_at,
                    claims: Some(verified.claims),
                }))
            }
        }
    }

    fn has_expired(&self, token: &Token) -> bool {
        token.expires_at - self.config().token_expire_early_secs as i64 <= now_unix()
    }

    async fn begin_redirect_sign_in(&self, options: SignInOptions) -> Result<(), AuthError> {
        let mut request = self.provider.oauth_client.authorize_url(CsrfToken::new_random);
        for scope in options.scopes {
            request = request.add_scope(Scope::new(scope));
        }

        let verifier = if self.config().pkce {
            let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
            request = request.set_pkce_challenge(challenge);
            Some(verifier)
        } else {
            None
        };

        let (auth_url, csrf_token) = request.url();

        // Store CSRF token (and PKCE verifier) for the callback, valid 10 minutes
        self.push_cookie(build_cookie(
            self.config(),
            STATE_COOKIE,
            csrf_token.secret(),
            Some(TRANSIENT_COOKIE_MAX_AGE_SECS),
        ));
        if let Some(verifier) = verifier {
            self.push_cookie(build_cookie(
                self.config(),
                PKCE_COOKIE,
                verifier.secret(),
                Some(TRANSIENT_COOKIE_MAX_AGE_SECS),
            ));
        }

        tracing::info!(
            authorize_url = %self.provider.endpoints().authorize,
            "Redirecting to Okta for authentication"
        );
        self.navigate(auth_url.to_string());
        Ok(())
    }

    async fn sign_out(&self, options: SignOutOptions) -> Result<(), AuthError> {
        let id_token = options.id_token_hint.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            AuthError::with_code(
                "missing_id_token",
                "No ID token available to end the Okta session",
            )
        })?;

        let logout_url = build_okta_logout_url(
            &self.provider.endpoints().logout,
            &id_token,
            &options.post_logout_redirect_uri,
        );
        tracing::info!("Redirecting to Okta logout");
        self.navigate(logout_url);
        Ok(())
    }

    fn clear_tokens(&self) {
        *lock(&self.store) = CookieStore::default();
        for name in TOKEN_COOKIES {
            self.push_cookie(build_clear_cookie(self.config(), name));
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<TokenEvent> {
        self.events.subscribe()
    }
}
