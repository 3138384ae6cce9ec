//! Authentication handlers for retry, logout and renewal
//!
//! This module contains the Axum HTTP handlers around the session core:
//! - `retry_handler`: the callback retry scheduled after a failed sign-in callback
//! - `logout_handler`: clears tokens, then Okta logout (or a local fallback)
//! - `renew_handler`: renews expired tokens for the application shell

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::client::{CallbackParams, OktaIdentityClient};
use crate::session::{sign_out, BootstrapSettings, RenewalAction, RenewalWatcher, SessionBootstrapper};
use crate::web::handlers::{respond, with_cookies};
use crate::web::page::HtmlPage;
use crate::AppState;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Serialize, PartialEq)]
pub struct RenewResponse {
    /// `ok`, `sign_in` or `error`
    pub status: &'static str,
    /// Where the shell must navigate when `status` is `sign_in`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Retry handler - clears partial tokens and starts a fresh sign-in
pub async fn retry_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    tracing::info!("Callback retry requested");

    let client = Arc::new(OktaIdentityClient::from_request(
        state.provider.clone(),
        &headers,
        CallbackParams::default(),
    ));
    let mut bootstrapper = SessionBootstrapper::new(
        client.clone(),
        HtmlPage::new(state.config.callback_path()),
        BootstrapSettings::from(state.config.as_ref()),
    );
    bootstrapper.retry_sign_in().await;

    respond(&state.config, client.take_effects(), bootstrapper.into_page().into_view())
}

/// Logout handler - ends the portal session, then the Okta session
///
/// Without a usable ID token Okta cannot end its session, so the browser is
/// sent straight to the sign-in redirect URI instead.
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let client = OktaIdentityClient::from_request(
        state.provider.clone(),
        &headers,
        CallbackParams::default(),
    );
    let mut page = HtmlPage::new(state.config.callback_path());

    let outcome = sign_out(
        &client,
        &mut page,
        &state.config.post_logout_redirect_uri,
        &state.config.redirect_uri,
    )
    .await;
    tracing::info!(outcome = ?outcome, "Logout finished");

    respond(&state.config, client.take_effects(), page.into_view())
}

/// Renewal handler - polled by the application shell
///
/// Renews an expired access token with the refresh token. When the session
/// can no longer be renewed the response carries the sign-in location.
pub async fn renew_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let client = Arc::new(OktaIdentityClient::from_request(
        state.provider.clone(),
        &headers,
        CallbackParams::default(),
    ));

    // Subscribe before renewing so no outcome is missed
    let mut watcher = RenewalWatcher::new(client.clone(), state.config.scopes.clone());
    client.renew_tokens().await;

    let status = match watcher.drain().await {
        Ok(RenewalAction::Continue) => "ok",
        Ok(RenewalAction::SignIn) => "sign_in",
        Err(e) => {
            tracing::error!(error = %e, "Renewal could not start sign-in");
            "error"
        }
    };

    let effects = client.take_effects();
    let body = RenewResponse {
        status,
        location: effects.navigation,
    };
    with_cookies(Json(body).into_response(), effects.set_cookies)
}
