//! Okta adapter
//!
//! This module plugs Okta into the session core and exposes the `/auth/*` routes.
//!
//! ## Structure
//!
//! - `client`: `OktaProvider` (process-wide) and `OktaIdentityClient` (per page load)
//! - `jwt`: ID token verification with JWKS caching
//! - `helpers`: Pure helper functions (endpoints, URL builders, cookies, HTTP client)
//! - `handlers`: HTTP handlers for callback retry, logout and token renewal
//!
//! ## Authentication Flow
//!
//! 1. User visits `/` without a session → redirect to Okta (state + PKCE cookies set)
//! 2. Okta authenticates → redirect back to `/?code=...&state=...`
//! 3. Portal exchanges the code, stores tokens in cookies, renders the shell
//! 4. The shell posts to `/auth/renew` periodically; an unrenewable session → back to step 1
//! 5. User posts `/auth/logout` → cookies cleared → Okta logout → back to `/`

pub mod client;
pub mod handlers;
pub mod helpers;
pub mod jwt;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CallbackParams, ClientEffects, OktaIdentityClient, OktaProvider};
pub use handlers::{logout_handler, renew_handler, retry_handler, RenewResponse};
pub use helpers::{build_okta_logout_url, extract_cookie, OktaEndpoints};
