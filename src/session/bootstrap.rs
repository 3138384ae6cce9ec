//! Session bootstrapper
//!
//! Decides once per page load whether the navigation is a redirect callback,
//! a reload with a live session, or a fresh visit, and drives the page into
//! `Authenticated`, `Redirecting`, `Unconfigured` or `Failed`.

use std::sync::Arc;
use std::time::Duration;

use super::identity::{IdentityClient, SignInOptions, TokenKind};
use super::page::{ConfigurationHelp, Page};
use super::profile::{load_profile, render_profile, UserProfile};
use super::state::{AuthState, SessionError};
use crate::config::Config;

/// Delay before a failed callback re-attempts sign-in
pub const CALLBACK_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// The slice of configuration the bootstrapper acts on
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSettings {
    pub configured: bool,
    pub help: ConfigurationHelp,
    pub scopes: Vec<String>,
    pub retry_delay: Duration,
}

impl From<&Config> for BootstrapSettings {
    fn from(config: &Config) -> Self {
        Self {
            configured: config.is_configured(),
            help: ConfigurationHelp {
                origin: config.origin(),
            },
            scopes: config.scopes.clone(),
            retry_delay: Duration::from_millis(config.callback_retry_delay_ms),
        }
    }
}

/// Per-page-load session controller
pub struct SessionBootstrapper<C, P> {
    client: Arc<C>,
    page: P,
    settings: BootstrapSettings,
    state: AuthState,
    profile: Option<UserProfile>,
    retry_scheduled: bool,
    retry_fired: bool,
}

impl<C, P> SessionBootstrapper<C, P>
where
    C: IdentityClient,
    P: Page,
{
    pub fn new(client: Arc<C>, page: P, settings: BootstrapSettings) -> Self {
        Self {
            client,
            page,
            settings,
            state: AuthState::Starting,
            profile: None,
            retry_scheduled: false,
            retry_fired: false,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Drive transitions until a terminal state is reached
    pub async fn run(&mut self) -> &AuthState {
        while !self.state.is_terminal() {
            let current = std::mem::replace(&mut self.state, AuthState::Starting);
            let from = current.name();
            let next = self.step(current).await;
            tracing::info!(from, to = next.name(), "Session state transition");
            self.state = next;
        }
        &self.state
    }

    /// Perform the work of `state` and return the state that follows it.
    ///
    /// Terminal states map to themselves.
    pub async fn step(&mut self, state: AuthState) -> AuthState {
        match state {
            AuthState::Starting => self.start(),
            AuthState::ProcessingCallback => self.process_callback().await,
            AuthState::CheckingSession => {
                if self.check_authentication().await {
                    tracing::info!("User is already authenticated");
                    AuthState::LoadingProfile
                } else {
                    tracing::info!("User not authenticated, redirecting to sign in");
                    AuthState::SigningIn
                }
            }
            AuthState::SigningIn => self.sign_in().await,
            AuthState::LoadingProfile => self.load_profile().await,
            terminal => terminal,
        }
    }

    fn start(&mut self) -> AuthState {
        if !self.settings.configured {
            tracing::warn!("Identity provider not configured; showing setup instructions");
            self.page.show_configuration_required(&self.settings.help);
            return AuthState::Unconfigured;
        }

        if self.client.is_redirect_callback() {
            tracing::info!("Processing authentication callback");
            AuthState::ProcessingCallback
        } else {
            AuthState::CheckingSession
        }
    }

    async fn process_callback(&mut self) -> AuthState {
        match self.client.parse_tokens_from_redirect().await {
            Ok(tokens) => {
                tracing::info!(
                    has_access_token = tokens.access_token.is_some(),
                    has_id_token = tokens.id_token.is_some(),
                    "Tokens parsed successfully"
                );
                self.client.set_tokens(tokens);
                self.page.clear_callback_params();
                AuthState::LoadingProfile
            }
            Err(e) => {
                tracing::error!(error = %e, code = ?e.code, "Error handling authentication callback");
                let failed = self.fail(SessionError::CallbackParseFailure(e));
                self.schedule_retry();
                failed
            }
        }
    }

    fn schedule_retry(&mut self) {
        if self.retry_scheduled {
            tracing::warn!("Callback retry already pending; not scheduling another");
            return;
        }
        self.retry_scheduled = true;
        tracing::info!(
            delay_ms = self.settings.retry_delay.as_millis() as u64,
            "Scheduling sign-in retry after callback failure"
        );
        self.page.schedule_retry(self.settings.retry_delay);
    }

    /// Fire the scheduled callback retry: clear partial tokens and sign in again.
    ///
    /// Only the first call per bootstrapper has any effect. Without a
    /// configured provider the setup instructions are shown instead.
    pub async fn retry_sign_in(&mut self) -> &AuthState {
        if self.retry_fired {
            tracing::debug!("Callback retry already fired");
            return &self.state;
        }
        self.retry_fired = true;
        if !self.settings.configured {
            self.state = AuthState::Starting;
            return self.run().await;
        }
        self.client.clear_tokens();
        self.state = AuthState::SigningIn;
        self.run().await
    }

    /// Session is valid iff both tokens are present and the access token is live
    pub async fn check_authentication(&self) -> bool {
        let access = self.client.get_token(TokenKind::Access).await;
        let id = self.client.get_token(TokenKind::Id).await;

        match (access, id) {
            (Ok(Some(access)), Ok(Some(_))) => !self.client.has_expired(&access),
            (Ok(_), Ok(_)) => false,
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Error checking authentication");
                false
            }
        }
    }

    async fn sign_in(&mut self) -> AuthState {
        let options = SignInOptions {
            scopes: self.settings.scopes.clone(),
        };
        match self.client.begin_redirect_sign_in(options).await {
            Ok(()) => AuthState::Redirecting,
            Err(e) => {
                tracing::error!(error = %e, "Sign in error");
                self.fail(SessionError::SignInFailure(e))
            }
        }
    }

    async fn load_profile(&mut self) -> AuthState {
        match load_profile(self.client.as_ref()).await {
            Ok(profile) => {
                tracing::info!(
                    sub = %profile.subject_id,
                    organization = %profile.organization,
                    groups = profile.groups.len(),
                    "User profile loaded"
                );
                render_profile(&mut self.page, &profile);
                self.profile = Some(profile);
                self.page.show_app();
                AuthState::Authenticated
            }
            Err(e) => {
                tracing::error!(error = %e, "Error loading user profile");
                self.fail(SessionError::ProfileLoadFailure(e))
            }
        }
    }

    fn fail(&mut self, error: SessionError) -> AuthState {
        self.page.show_error(&error.to_string());
        AuthState::Failed(error)
    }
}
