//! PKCE (Proof Key for Code Exchange) per RFC 7636, plus state generation
//!
//! Generates the code verifier and S256 challenge used during the OAuth
//! authorization flow, and the `state` value that correlates a provider
//! callback with the pending session that initiated it. The verifier is
//! held server-side in the session cache and sent during token exchange;
//! the challenge rides in the authorization URL so the provider can verify
//! the exchange request came from the same party that started the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::app::OAuthApp;
use crate::constants::{SCOPES, STATE_NONCE_BYTES, VERIFIER_BYTES};

/// Generate a cryptographically random PKCE code verifier.
///
/// 64 random bytes encoded as URL-safe base64 without padding, giving an
/// 86-character verifier. RFC 7636 requires 43-128 characters.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate the state value for an authorization round-trip.
///
/// Format is the external id, a `:` separator, and a random hex nonce.
/// The prefix keeps provider callbacks legible in logs; the session cache
/// is the authority for which external id a state belongs to, so the
/// callback path never parses this value.
pub fn generate_state(external_id: &str) -> String {
    let mut bytes = [0u8; STATE_NONCE_BYTES];
    rand::rng().fill(&mut bytes);
    format!("{external_id}:{}", hex::encode(bytes))
}

/// Build the full authorization URL for a pending flow.
///
/// The provider echoes `state` back unchanged in the callback query, which
/// is what lets us find the session (and reject forged callbacks).
pub fn build_authorization_url(app: &OAuthApp, state: &str, challenge: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&code_challenge={}&code_challenge_method=S256&state={}",
        app.authorize_url,
        app.client_id,
        urlencoded(&app.redirect_uri),
        urlencoded(SCOPES),
        challenge,
        urlencoded(state),
    )
}

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing. The
/// external id embedded in `state` is caller-supplied, so the reserved
/// query characters all need covering.
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('+', "%2B")
        .replace('?', "%3F")
        .replace('#', "%23")
        .replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
}
