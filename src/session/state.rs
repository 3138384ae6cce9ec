use thiserror::Error;

use super::identity::AuthError;
use super::profile::ProfileError;

/// Failures the session core can end a page load with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Identity provider is not configured")]
    ConfigurationMissing,

    #[error("Authentication failed: {0}")]
    CallbackParseFailure(AuthError),

    #[error("Failed to initiate sign in: {0}")]
    SignInFailure(AuthError),

    #[error("Failed to load user profile: {0}")]
    ProfileLoadFailure(ProfileError),

    #[error("Token renewal failed: {0}")]
    RenewalFailure(AuthError),

    #[error("Sign out failed: {0}")]
    SignOutFailure(AuthError),
}

/// Where the bootstrapper is in the page-load sequence
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Starting,
    /// Configuration still holds placeholders; terminal until fixed by hand
    Unconfigured,
    CheckingSession,
    ProcessingCallback,
    SigningIn,
    LoadingProfile,
    Authenticated,
    /// A sign-in navigation was issued; nothing more happens on this page
    Redirecting,
    Failed(SessionError),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthState::Unconfigured
                | AuthState::Authenticated
                | AuthState::Redirecting
                | AuthState::Failed(_)
        )
    }

    /// Short label for log lines
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Starting => "starting",
            AuthState::Unconfigured => "unconfigured",
            AuthState::CheckingSession => "checking_session",
            AuthState::ProcessingCallback => "processing_callback",
            AuthState::SigningIn => "signing_in",
            AuthState::LoadingProfile => "loading_profile",
            AuthState::Authenticated => "authenticated",
            AuthState::Redirecting => "redirecting",
            AuthState::Failed(_) => "failed",
        }
    }
}
