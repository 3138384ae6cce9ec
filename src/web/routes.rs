use super::handlers::{healthz_handler, portal_handler, readyz_handler};
use crate::{
    auth::{logout_handler, renew_handler, retry_handler},
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(portal_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/auth/retry", get(retry_handler))
        // POST from the shell's logout form; GET for direct navigation
        .route("/auth/logout", get(logout_handler).post(logout_handler))
        .route("/auth/renew", post(renew_handler))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}
