//! OAuth token exchange and refresh
//!
//! The two token endpoint interactions:
//! 1. Authorization code exchange (completing a callback)
//! 2. Token refresh (explicit via `/refresh`, opportunistic before catalog
//!    calls)
//!
//! Both POST a form to the application's token endpoint with different
//! grant types. Neither retries; the caller decides what a failure means
//! for its HTTP response.

use serde::Deserialize;

use crate::app::OAuthApp;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from response time; the caller
/// converts it to an absolute unix-seconds timestamp when storing the
/// record, substituting a default lifetime when the provider omits it.
/// A body without `access_token` or `refresh_token` fails to parse and
/// surfaces as a `TokenExchange` error.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: Option<u64>,
}

/// Exchange an authorization code for tokens.
///
/// Second half of the PKCE flow: the user authorized in their browser and
/// the provider redirected back with a code. The stored verifier proves we
/// initiated the flow the code came from.
pub async fn exchange_code(
    client: &reqwest::Client,
    app: &OAuthApp,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", verifier),
        ("client_id", &app.client_id),
        ("redirect_uri", &app.redirect_uri),
    ];
    if let Some(secret) = &app.client_secret {
        form.push(("client_secret", secret.expose()));
    }

    let response = client
        .post(&app.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}

/// Refresh an access token using a refresh token.
///
/// The provider may rotate the refresh token or hand the same one back;
/// either way the response value is the one to store.
pub async fn refresh_token(
    client: &reqwest::Client,
    app: &OAuthApp,
    refresh: &str,
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh),
        ("client_id", &app.client_id),
    ];
    if let Some(secret) = &app.client_secret {
        form.push(("client_secret", secret.expose()));
    }

    let response = client
        .post(&app.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 401/403 means the refresh token is revoked or invalid
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}
