//! Presentation target for the session core

use std::time::Duration;

/// Values shown in the "configuration required" message
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationHelp {
    /// Origin to register as redirect URI and trusted origin
    pub origin: String,
}

/// Text placed in the user badge of the application shell
#[derive(Debug, Clone, PartialEq)]
pub struct UserDisplay {
    pub name: String,
    pub organization: String,
    pub initials: String,
}

/// Opaque rendering target driven by the bootstrapper.
///
/// Every method is a trivial text/attribute update or a navigation request.
pub trait Page {
    /// Replace the loading screen with setup instructions
    fn show_configuration_required(&mut self, help: &ConfigurationHelp);

    /// Replace the loading screen with an error and a manual reload affordance
    fn show_error(&mut self, message: &str);

    fn display_user(&mut self, user: &UserDisplay);

    /// Hide the loading screen and reveal the application shell
    fn show_app(&mut self);

    /// Drop authorization response parameters from the visible URL without reloading
    fn clear_callback_params(&mut self);

    /// Hard navigation to `url`
    fn navigate(&mut self, url: &str);

    /// Arrange for the callback retry to fire once after `delay`
    fn schedule_retry(&mut self, delay: Duration);
}
