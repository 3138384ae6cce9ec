use super::page::{LoadingScreen, PageView};
use askama::Template;

/// Route the scheduled callback retry lands on
pub const RETRY_PATH: &str = "/auth/retry";

#[derive(Template)]
#[template(path = "portal.html")]
pub struct PortalTemplate {
    /// Origin shown in the setup instructions
    pub origin: Option<String>,
    pub error_message: Option<String>,
    pub app_visible: bool,
    pub user_name: String,
    pub user_org: String,
    pub user_initials: String,
    pub replace_url: Option<String>,
    pub retry_url: &'static str,
    pub retry_after_ms: Option<u64>,
    pub renew_interval_secs: u64,
}

impl PortalTemplate {
    pub fn from_view(view: &PageView, renew_interval_secs: u64) -> Self {
        let (origin, error_message) = match &view.loading {
            LoadingScreen::Spinner => (None, None),
            LoadingScreen::ConfigurationRequired { origin } => (Some(origin.clone()), None),
            LoadingScreen::Error { message } => (None, Some(message.clone())),
        };
        let (user_name, user_org, user_initials) = match &view.user {
            Some(user) => (
                user.name.clone(),
                user.organization.clone(),
                user.initials.clone(),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        Self {
            origin,
            error_message,
            app_visible: view.app_visible,
            user_name,
            user_org,
            user_initials,
            replace_url: view.replace_url.clone(),
            retry_url: RETRY_PATH,
            retry_after_ms: view.retry_after.map(|d| d.as_millis() as u64),
            renew_interval_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserDisplay;
    use std::time::Duration;

    #[test]
    fn test_configuration_instructions_rendered() {
        let view = PageView {
            loading: LoadingScreen::ConfigurationRequired {
                origin: "http://localhost:9000".to_string(),
            },
            ..PageView::default()
        };
        let html = PortalTemplate::from_view(&view, 300).render().unwrap();
        assert!(html.contains("Configuration Required"));
        assert!(html.contains("http://localhost:9000"));
        assert!(!html.contains("id=\"app\""));
    }

    #[test]
    fn test_error_message_is_escaped_and_retry_scheduled() {
        let view = PageView {
            loading: LoadingScreen::Error {
                message: "Authentication failed: <script>alert(1)</script>".to_string(),
            },
            retry_after: Some(Duration::from_millis(3000)),
            ..PageView::default()
        };
        let html = PortalTemplate::from_view(&view, 300).render().unwrap();
        assert!(html.contains("Authentication failed: &#60;script&#62;") || html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("data-retry-after-ms=\"3000\""));
        assert!(html.contains("data-retry-url=\"/auth/retry\""));
        assert!(html.contains("Reload Page"));
    }

    #[test]
    fn test_authenticated_shell_shows_user_badge() {
        let view = PageView {
            app_visible: true,
            user: Some(UserDisplay {
                name: "Jane Doe".to_string(),
                organization: "Cofense".to_string(),
                initials: "JD".to_string(),
            }),
            replace_url: Some("/".to_string()),
            ..PageView::default()
        };
        let html = PortalTemplate::from_view(&view, 300).render().unwrap();
        assert!(html.contains("id=\"user-name\">Jane Doe<"));
        assert!(html.contains("id=\"user-org\">Cofense<"));
        assert!(html.contains("id=\"user-initials\">JD<"));
        assert!(html.contains("data-replace-url=\"/\""));
        assert!(html.contains("data-renew-interval-secs=\"300\""));
        assert!(!html.contains("id=\"loading-screen\""));
    }
}
