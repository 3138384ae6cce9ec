use super::page::{HtmlPage, PageView};
use super::templates::PortalTemplate;
use crate::{
    auth::{CallbackParams, ClientEffects, OktaIdentityClient},
    config::Config,
    session::{BootstrapSettings, SessionBootstrapper},
    AppState,
};
use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::sync::Arc;

/// Liveness check - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness check - checks if the service is ready to handle requests
///
/// Returns 200 OK if:
/// - Okta is configured and its JWKS has been cached
///
/// Returns 503 Service Unavailable otherwise
pub async fn readyz_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.config.is_configured() {
        tracing::warn!("Readiness check failed: Okta not configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready: identity provider not configured",
        );
    }

    if state.provider.validator().is_jwks_cached().await {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("Readiness check failed: JWKS not cached");
        (StatusCode::SERVICE_UNAVAILABLE, "not ready: JWKS not cached")
    }
}

/// Page load - runs the session bootstrapper for this navigation
pub async fn portal_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let client = Arc::new(OktaIdentityClient::from_request(
        state.provider.clone(),
        &headers,
        params,
    ));
    let page = HtmlPage::new(state.config.callback_path());

    let mut bootstrapper = SessionBootstrapper::new(
        client.clone(),
        page,
        BootstrapSettings::from(state.config.as_ref()),
    );
    let outcome = bootstrapper.run().await.name();
    tracing::debug!(
        state = outcome,
        sub = ?bootstrapper.profile().map(|p| p.subject_id.as_str()),
        "Page load finished"
    );

    respond(&state.config, client.take_effects(), bootstrapper.into_page().into_view())
}

/// Create a HeaderValue from a string, returning an error response if invalid.
/// This prevents panics from malformed cookie values.
pub(crate) fn header_value(s: &str) -> Result<HeaderValue, Box<Response>> {
    HeaderValue::from_str(s).map_err(|e| {
        tracing::error!(
            error = %e,
            value_len = s.len(),
            "Failed to create header value - possible malformed token"
        );
        Box::new(
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error setting response headers",
            )
                .into_response(),
        )
    })
}

/// Attach queued cookies to `response`
pub(crate) fn with_cookies(mut response: Response, cookies: Vec<String>) -> Response {
    for cookie in cookies {
        match header_value(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => return *e,
        }
    }
    // Auth state lives in these responses; never let a cache replay them
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Turn a finished page load into an HTTP response.
///
/// A navigation requested by the identity client or the page becomes a
/// redirect; otherwise the view is rendered.
pub(crate) fn respond(config: &Config, effects: ClientEffects, view: PageView) -> Response {
    let navigation = effects.navigation.or_else(|| view.navigation.clone());

    let response = match navigation {
        Some(location) => Redirect::to(&location).into_response(),
        None => {
            let template = PortalTemplate::from_view(&view, config.token_renew_interval_secs);
            match template.render() {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to render portal template");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
                }
            }
        }
    };

    with_cookies(response, effects.set_cookies)
}
