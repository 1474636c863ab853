//! Registered OAuth application identity

use common::Secret;

use crate::constants::{AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};

/// The Epic application this service acts as.
///
/// The client id and redirect URI come from the environment at startup; the
/// client secret is optional because Epic supports public (PKCE-only)
/// clients. Endpoint URLs default to the public Epic endpoints and stay
/// writable so tests can point the flow at a local server.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthApp {
    /// Build an application identity against the public Epic endpoints.
    pub fn new(
        client_id: String,
        client_secret: Option<Secret<String>>,
        redirect_uri: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_epic_endpoints() {
        let app = OAuthApp::new(
            "client-123".into(),
            None,
            "https://bridge.example/callback".into(),
        );
        assert_eq!(app.authorize_url, AUTHORIZE_ENDPOINT);
        assert_eq!(app.token_url, TOKEN_ENDPOINT);
        assert_eq!(app.client_id, "client-123");
        assert!(app.client_secret.is_none());
    }

    #[test]
    fn debug_redacts_client_secret() {
        let app = OAuthApp::new(
            "client-123".into(),
            Some(Secret::new("super-secret".into())),
            "https://bridge.example/callback".into(),
        );
        let debug = format!("{app:?}");
        assert!(!debug.contains("super-secret"), "got: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
