//! Session core
//!
//! Environment-agnostic authentication bootstrap for the portal.
//!
//! ## Structure
//!
//! - `identity`: capability set the core needs from an identity SDK
//! - `page`: presentation target the core renders into
//! - `state`: `AuthState` and the `SessionError` taxonomy
//! - `bootstrap`: the per-page-load state machine
//! - `profile`: claims → `UserProfile` projection and initials
//! - `renewal`: reaction to background token renewal outcomes
//! - `signout`: sign-out with hard-navigation fallback
//!
//! ## Page load
//!
//! 1. Placeholder configuration → setup instructions, stop
//! 2. Redirect callback → parse and persist tokens, strip the URL, load profile
//! 3. Live session → load profile
//! 4. Otherwise → redirect to the identity provider

pub mod bootstrap;
pub mod identity;
pub mod page;
pub mod profile;
pub mod renewal;
pub mod signout;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::{BootstrapSettings, SessionBootstrapper, CALLBACK_RETRY_DELAY};
pub use identity::{
    AuthError, IdentityClient, SignInOptions, SignOutOptions, Token, TokenEvent, TokenKind,
    TokenSet,
};
pub use page::{ConfigurationHelp, Page, UserDisplay};
pub use profile::{initials, IdentityClaims, ProfileError, UserProfile, DEFAULT_ORGANIZATION};
pub use renewal::{RenewalAction, RenewalWatcher};
pub use signout::{sign_out, SignOutOutcome};
pub use state::{AuthState, SessionError};
