//! Server-rendered presentation target
//!
//! `HtmlPage` records what the session core asked the page to show. The
//! resulting `PageView` is rendered by `PortalTemplate`, or turned into a
//! redirect when a navigation was requested.

use std::time::Duration;

use crate::session::{ConfigurationHelp, Page, UserDisplay};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadingScreen {
    #[default]
    Spinner,
    ConfigurationRequired {
        origin: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageView {
    pub loading: LoadingScreen,
    pub app_visible: bool,
    pub user: Option<UserDisplay>,
    /// Path the browser should show instead of the callback URL
    pub replace_url: Option<String>,
    pub retry_after: Option<Duration>,
    pub navigation: Option<String>,
}

pub struct HtmlPage {
    callback_path: String,
    view: PageView,
}

impl HtmlPage {
    pub fn new(callback_path: impl Into<String>) -> Self {
        Self {
            callback_path: callback_path.into(),
            view: PageView::default(),
        }
    }

    pub fn into_view(self) -> PageView {
        self.view
    }
}

impl Page for HtmlPage {
    fn show_configuration_required(&mut self, help: &ConfigurationHelp) {
        self.view.loading = LoadingScreen::ConfigurationRequired {
            origin: help.origin.clone(),
        };
    }

    fn show_error(&mut self, message: &str) {
        self.view.loading = LoadingScreen::Error {
            message: message.to_string(),
        };
    }

    fn display_user(&mut self, user: &UserDisplay) {
        self.view.user = Some(user.clone());
    }

    fn show_app(&mut self) {
        self.view.app_visible = true;
    }

    fn clear_callback_params(&mut self) {
        self.view.replace_url = Some(self.callback_path.clone());
    }

    fn navigate(&mut self, url: &str) {
        self.view.navigation = Some(url.to_string());
    }

    fn schedule_retry(&mut self, delay: Duration) {
        // Only the first request counts; the page holds a single timer
        if self.view.retry_after.is_none() {
            self.view.retry_after = Some(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_records_core_requests() {
        let mut page = HtmlPage::new("/");
        page.display_user(&UserDisplay {
            name: "Jane Doe".to_string(),
            organization: "Cofense".to_string(),
            initials: "JD".to_string(),
        });
        page.clear_callback_params();
        page.show_app();

        let view = page.into_view();
        assert!(view.app_visible);
        assert_eq!(view.replace_url.as_deref(), Some("/"));
        assert_eq!(view.user.unwrap().initials, "JD");
        assert_eq!(view.loading, LoadingScreen::Spinner);
    }

    #[test]
    fn test_error_replaces_loading_screen_and_keeps_first_timer() {
        let mut page = HtmlPage::new("/");
        page.show_error("Authentication failed: state mismatch");
        page.schedule_retry(Duration::from_millis(3000));
        page.schedule_retry(Duration::from_millis(10));

        let view = page.into_view();
        assert_eq!(
            view.loading,
            LoadingScreen::Error {
                message: "Authentication failed: state mismatch".to_string()
            }
        );
        assert_eq!(view.retry_after, Some(Duration::from_millis(3000)));
        assert!(!view.app_visible);
    }
}
