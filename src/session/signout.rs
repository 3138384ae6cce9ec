use super::identity::{IdentityClient, SignOutOptions, TokenKind};
use super::page::Page;
use super::state::SessionError;

#[derive(Debug, Clone, PartialEq)]
pub enum SignOutOutcome {
    /// The identity client issued its sign-out redirect
    IdentityRedirect,
    /// The identity client failed; the page was sent straight to the redirect URI
    FallbackNavigation(SessionError),
}

/// End the session: clear local tokens, then let the identity provider end its session.
///
/// The provider returns the browser to `post_logout_redirect_uri`. Never a
/// silent no-op: if the provider sign-out cannot be issued the page is
/// hard-navigated to `redirect_uri` instead.
pub async fn sign_out<C, P>(
    client: &C,
    page: &mut P,
    post_logout_redirect_uri: &str,
    redirect_uri: &str,
) -> SignOutOutcome
where
    C: IdentityClient,
    P: Page,
{
    tracing::info!("Signing out user");

    // The raw identity token is the provider's session hint; grab it before clearing
    let id_token_hint = match client.get_token(TokenKind::Id).await {
        Ok(token) => token.map(|t| t.value),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read identity token for sign-out hint");
            None
        }
    };

    client.clear_tokens();

    let options = SignOutOptions {
        post_logout_redirect_uri: post_logout_redirect_uri.to_string(),
        id_token_hint,
    };

    match client.sign_out(options).await {
        Ok(()) => SignOutOutcome::IdentityRedirect,
        Err(e) => {
            tracing::error!(error = %e, "Sign out error; forcing navigation to clear state");
            page.navigate(redirect_uri);
            SignOutOutcome::FallbackNavigation(SessionError::SignOutFailure(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::identity::AuthError;
    use crate::session::testing::{valid_session, Call, FakeIdentityClient, PageEvent, RecordingPage};

    const LANDING: &str = "http://localhost:9000/";
    const GOODBYE: &str = "http://localhost:9000/goodbye";

    #[tokio::test]
    async fn test_sign_out_clears_then_redirects_through_provider() {
        let client = FakeIdentityClient::new().with_tokens(valid_session());
        let mut page = RecordingPage::default();

        let outcome = sign_out(&client, &mut page, GOODBYE, LANDING).await;

        assert_eq!(outcome, SignOutOutcome::IdentityRedirect);
        assert!(page.events.is_empty());
        assert_eq!(
            client.calls(),
            vec![
                Call::GetToken(TokenKind::Id),
                Call::ClearTokens,
                Call::SignOut(SignOutOptions {
                    post_logout_redirect_uri: GOODBYE.to_string(),
                    id_token_hint: Some("header.payload.signature".to_string()),
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_sign_out_failure_falls_back_to_redirect_uri() {
        let client = FakeIdentityClient::new()
            .with_tokens(valid_session())
            .with_sign_out_error(AuthError::new("logout endpoint unreachable"));
        let mut page = RecordingPage::default();

        let outcome = sign_out(&client, &mut page, GOODBYE, LANDING).await;

        let SignOutOutcome::FallbackNavigation(SessionError::SignOutFailure(err)) = outcome else {
            panic!("expected fallback navigation, got {:?}", outcome);
        };
        assert_eq!(err.message, "logout endpoint unreachable");
        assert_eq!(page.events, vec![PageEvent::Navigate(LANDING.to_string())]);
        assert_eq!(client.count(|c| *c == Call::ClearTokens), 1);
    }

    #[tokio::test]
    async fn test_sign_out_without_session_still_proceeds() {
        let client = FakeIdentityClient::new();
        let mut page = RecordingPage::default();

        let outcome = sign_out(&client, &mut page, GOODBYE, LANDING).await;

        assert_eq!(outcome, SignOutOutcome::IdentityRedirect);
        assert!(client.calls().contains(&Call::SignOut(SignOutOptions {
            post_logout_redirect_uri: GOODBYE.to_string(),
            id_token_hint: None,
        })));
    }
}
