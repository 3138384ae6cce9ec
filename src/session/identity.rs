//! Identity client capability set
//!
//! The session core never speaks OAuth2 itself. Everything protocol-shaped
//! (authorization URLs, code exchange, token storage, expiry) sits behind
//! [`IdentityClient`], which the portal implements on top of Okta and tests
//! implement with an in-memory fake.

use std::future::Future;

use thiserror::Error;
use tokio::sync::broadcast;

use super::profile::IdentityClaims;

/// Error codes after which a token can no longer be renewed silently
pub const REAUTHENTICATION_ERROR_CODES: &[&str] = &["login_required", "invalid_grant"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Id,
    Refresh,
}

impl TokenKind {
    /// Key used for the token in the client's store and in log lines
    pub fn storage_key(&self) -> &'static str {
        match self {
            TokenKind::Access => "accessToken",
            TokenKind::Id => "idToken",
            TokenKind::Refresh => "refreshToken",
        }
    }
}

/// A single issued token as held by the identity client's store
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// Expiry as unix seconds
    pub expires_at: i64,
    /// Claims, present for identity tokens only
    pub claims: Option<IdentityClaims>,
}

/// Tokens issued together by one grant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenSet {
    pub access_token: Option<Token>,
    pub id_token: Option<Token>,
    pub refresh_token: Option<Token>,
}

impl TokenSet {
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        [&self.access_token, &self.id_token, &self.refresh_token]
            .into_iter()
            .flatten()
    }
}

/// Error reported by the identity client.
///
/// The message is opaque display text; only `code` is ever inspected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthError {
    pub code: Option<String>,
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Whether the session is gone and only a fresh sign-in can recover it
    pub fn requires_reauthentication(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| REAUTHENTICATION_ERROR_CODES.contains(&code))
    }
}

/// Notifications published by the token store while the page is alive
#[derive(Debug, Clone, PartialEq)]
pub enum TokenEvent {
    Renewed { kind: TokenKind },
    Error(AuthError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignInOptions {
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignOutOptions {
    pub post_logout_redirect_uri: String,
    /// Raw identity token identifying the session to end, when one was held
    pub id_token_hint: Option<String>,
}

/// Capabilities the session core needs from an identity SDK.
///
/// Methods take `&self`; implementations keep their token store behind
/// interior mutability so the client can be shared with a renewal watcher.
pub trait IdentityClient: Send + Sync {
    /// Whether the current navigation carries an authorization response
    fn is_redirect_callback(&self) -> bool;

    /// Turn the authorization response in the current URL into tokens
    fn parse_tokens_from_redirect(&self)
        -> impl Future<Output = Result<TokenSet, AuthError>> + Send;

    /// Persist tokens into the store
    fn set_tokens(&self, tokens: TokenSet);

    /// Read a token from the store; `Ok(None)` when absent or unusable
    fn get_token(&self, kind: TokenKind)
        -> impl Future<Output = Result<Option<Token>, AuthError>> + Send;

    fn has_expired(&self, token: &Token) -> bool;

    /// Navigate away to the provider's sign-in page
    fn begin_redirect_sign_in(
        &self,
        options: SignInOptions,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Navigate away to the provider's sign-out endpoint
    fn sign_out(&self, options: SignOutOptions)
        -> impl Future<Output = Result<(), AuthError>> + Send;

    fn clear_tokens(&self);

    /// Subscribe to renewal notifications published after this call
    fn subscribe(&self) -> broadcast::Receiver<TokenEvent>;
}
