//! Background token renewal handling
//!
//! The identity client renews tokens on its own and publishes the outcome.
//! The watcher only decides whether an outcome means the session is gone.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};

use super::identity::{IdentityClient, SignInOptions, TokenEvent};
use super::state::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalAction {
    /// Nothing to do; the session continues
    Continue,
    /// The session cannot be renewed; a sign-in navigation is required
    SignIn,
}

/// Map a renewal notification to what the page must do about it
pub fn classify(event: &TokenEvent) -> RenewalAction {
    match event {
        TokenEvent::Renewed { .. } => RenewalAction::Continue,
        TokenEvent::Error(e) if e.requires_reauthentication() => RenewalAction::SignIn,
        TokenEvent::Error(_) => RenewalAction::Continue,
    }
}

pub struct RenewalWatcher<C> {
    client: Arc<C>,
    scopes: Vec<String>,
    events: broadcast::Receiver<TokenEvent>,
    signed_in: bool,
}

impl<C: IdentityClient> RenewalWatcher<C> {
    pub fn new(client: Arc<C>, scopes: Vec<String>) -> Self {
        let events = client.subscribe();
        Self {
            client,
            scopes,
            events,
            signed_in: false,
        }
    }

    /// React to a single notification.
    ///
    /// At most one sign-in is requested per watcher; the navigation ends the page.
    async fn handle(&mut self, event: TokenEvent) -> Result<RenewalAction, SessionError> {
        match &event {
            TokenEvent::Renewed { kind } => {
                tracing::info!(key = kind.storage_key(), "Token renewed");
            }
            TokenEvent::Error(e) => {
                tracing::error!(error = %e, code = ?e.code, "Token renewal error");
            }
        }

        let action = classify(&event);
        if action == RenewalAction::SignIn && !self.signed_in {
            self.signed_in = true;
            let options = SignInOptions {
                scopes: self.scopes.clone(),
            };
            self.client
                .begin_redirect_sign_in(options)
                .await
                .map_err(SessionError::SignInFailure)?;
        }
        Ok(action)
    }

    /// Process every notification already queued, without waiting for more
    pub async fn drain(&mut self) -> Result<RenewalAction, SessionError> {
        let mut outcome = RenewalAction::Continue;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if self.handle(event).await? == RenewalAction::SignIn {
                        outcome = RenewalAction::SignIn;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renewal watcher lagged behind token events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(outcome),
            }
        }
    }
}
