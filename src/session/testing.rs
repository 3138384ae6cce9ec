//! In-memory doubles for the identity client and page

use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;

use super::identity::{
    AuthError, IdentityClient, SignInOptions, SignOutOptions, Token, TokenEvent, TokenKind,
    TokenSet,
};
use super::page::{ConfigurationHelp, Page, UserDisplay};
use super::profile::IdentityClaims;

/// Fixed clock for the fake store
pub(crate) const NOW: i64 = 1_700_000_000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ParseTokens,
    SetTokens,
    GetToken(TokenKind),
    SignIn(SignInOptions),
    SignOut(SignOutOptions),
    ClearTokens,
}

#[derive(Default)]
struct FakeStore {
    callback: bool,
    parse_result: Option<Result<TokenSet, AuthError>>,
    tokens: TokenSet,
    get_error: Option<AuthError>,
    sign_in_error: Option<AuthError>,
    sign_out_error: Option<AuthError>,
    calls: Vec<Call>,
}

pub(crate) struct FakeIdentityClient {
    store: Mutex<FakeStore>,
    events: broadcast::Sender<TokenEvent>,
}

impl FakeIdentityClient {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store: Mutex::new(FakeStore::default()),
            events,
        }
    }

    pub(crate) fn with_tokens(self, tokens: TokenSet) -> Self {
        self.store.lock().unwrap().tokens = tokens;
        self
    }

    pub(crate) fn with_callback(self, result: Result<TokenSet, AuthError>) -> Self {
        {
            let mut store = self.store.lock().unwrap();
            store.callback = true;
            store.parse_result = Some(result);
        }
        self
    }

    pub(crate) fn with_store_error(self, error: AuthError) -> Self {
        self.store.lock().unwrap().get_error = Some(error);
        self
    }

    pub(crate) fn with_sign_in_error(self, error: AuthError) -> Self {
        self.store.lock().unwrap().sign_in_error = Some(error);
        self
    }

    pub(crate) fn with_sign_out_error(self, error: AuthError) -> Self {
        self.store.lock().unwrap().sign_out_error = Some(error);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.store.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub(crate) fn sign_in_count(&self) -> usize {
        self.count(|c| matches!(c, Call::SignIn(_)))
    }

    pub(crate) fn stored(&self) -> TokenSet {
        self.store.lock().unwrap().tokens.clone()
    }

    pub(crate) fn publish(&self, event: TokenEvent) {
        let _ = self.events.send(event);
    }

    fn record(&self, call: Call) {
        self.store.lock().unwrap().calls.push(call);
    }
}

impl IdentityClient for FakeIdentityClient {
    fn is_redirect_callback(&self) -> bool {
        self.store.lock().unwrap().callback
    }

    async fn parse_tokens_from_redirect(&self) -> Result<TokenSet, AuthError> {
        self.record(Call::ParseTokens);
        self.store
            .lock()
            .unwrap()
            .parse_result
            .take()
            .unwrap_or_else(|| Err(AuthError::new("no authorization response")))
    }

    fn set_tokens(&self, tokens: TokenSet) {
        self.record(Call::SetTokens);
        self.store.lock().unwrap().tokens = tokens;
    }

    async fn get_token(&self, kind: TokenKind) -> Result<Option<Token>, AuthError> {
        self.record(Call::GetToken(kind));
        let store = self.store.lock().unwrap();
        if let Some(error) = &store.get_error {
            return Err(error.clone());
        }
        let token = match kind {
            TokenKind::Access => &store.tokens.access_token,
            TokenKind::Id => &store.tokens.id_token,
            TokenKind::Refresh => &store.tokens.refresh_token,
        };
        Ok(token.clone())
    }

    fn has_expired(&self, token: &Token) -> bool {
        token.expires_at <= NOW
    }

    async fn begin_redirect_sign_in(&self, options: SignInOptions) -> Result<(), AuthError> {
        self.record(Call::SignIn(options));
        match self.store.lock().unwrap().sign_in_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn sign_out(&self, options: SignOutOptions) -> Result<(), AuthError> {
        self.record(Call::SignOut(options));
        match self.store.lock().unwrap().sign_out_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn clear_tokens(&self) {
        self.record(Call::ClearTokens);
        self.store.lock().unwrap().tokens = TokenSet::default();
    }

    fn subscribe(&self) -> broadcast::Receiver<TokenEvent> {
        self.events.subscribe()
    }
}

pub(crate) fn access_token(expires_at: i64) -> Token {
    Token {
        kind: TokenKind::Access,
        value: "access-token".to_string(),
        expires_at,
        claims: None,
    }
}

pub(crate) fn id_token(claims: serde_json::Value) -> Token {
    Token {
        kind: TokenKind::Id,
        value: "header.payload.signature".to_string(),
        expires_at: NOW + 3600,
        claims: Some(serde_json::from_value::<IdentityClaims>(claims).unwrap()),
    }
}

/// Access + identity tokens for "Jane Doe", valid for another hour
pub(crate) fn valid_session() -> TokenSet {
    TokenSet {
        access_token: Some(access_token(NOW + 3600)),
        id_token: Some(id_token(json!({
            "sub": "00u1jane",
            "name": "Jane Doe",
            "email": "jane@x.com"
        }))),
        refresh_token: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PageEvent {
    ConfigurationRequired(String),
    Error(String),
    User(UserDisplay),
    ShowApp,
    ClearCallbackParams,
    Navigate(String),
    ScheduleRetry(Duration),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingPage {
    pub(crate) events: Vec<PageEvent>,
}

impl RecordingPage {
    pub(crate) fn count(&self, matches: impl Fn(&PageEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }
}

impl Page for RecordingPage {
    fn show_configuration_required(&mut self, help: &ConfigurationHelp) {
        self.events
            .push(PageEvent::ConfigurationRequired(help.origin.clone()));
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(PageEvent::Error(message.to_string()));
    }

    fn display_user(&mut self, user: &UserDisplay) {
        self.events.push(PageEvent::User(user.clone()));
    }

    fn show_app(&mut self) {
        self.events.push(PageEvent::ShowApp);
    }

    fn clear_callback_params(&mut self) {
        self.events.push(PageEvent::ClearCallbackParams);
    }

    fn navigate(&mut self, url: &str) {
        self.events.push(PageEvent::Navigate(url.to_string()));
    }

    fn schedule_retry(&mut self, delay: Duration) {
        self.events.push(PageEvent::ScheduleRetry(delay));
    }
}
