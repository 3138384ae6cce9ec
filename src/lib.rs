//! Content portal library
//!
//! Okta sign-in bootstrap and profile display for the content portal shell.

#![cfg_attr(not(test), deny(dead_code))]

pub mod auth;
pub mod config;
pub mod session;
pub mod web;

use auth::OktaProvider;
use config::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Okta client, HTTP client and JWKS cache shared by every request
    pub provider: Arc<OktaProvider>,
}
