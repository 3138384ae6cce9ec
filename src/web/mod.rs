//! HTTP surface of the portal
//!
//! - `handlers`: page load, health and readiness
//! - `page`: the `Page` implementation rendered into HTML or a redirect
//! - `templates`: Askama templates
//! - `routes`: the Axum router

pub mod handlers;
pub mod page;
pub mod routes;
pub mod templates;

pub use routes::create_router;
