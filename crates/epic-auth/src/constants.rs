//! Epic OAuth constants
//!
//! Fixed endpoints and flow parameters. The application identity (client id,
//! optional secret, redirect URI) is deployment-specific and comes from the
//! environment; see `OAuthApp`.

/// Authorization endpoint where the user grants access in their browser.
pub const AUTHORIZE_ENDPOINT: &str = "https://www.epicgames.com/id/authorize";

/// Token endpoint for code exchange and token refresh.
pub const TOKEN_ENDPOINT: &str = "https://api.epicgames.dev/epic/oauth/v2/token";

/// OAuth scopes requested during authorization. `basic_profile` is enough to
/// link the account; this service never reads friends or presence data.
pub const SCOPES: &str = "basic_profile";

/// Lifetime of a pending authorization session. A user who takes longer than
/// this between `/login` and the provider callback has to start over.
pub const SESSION_TTL_SECS: u64 = 600;

/// Access-token lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// How close to expiry a stored access token may get before request-time
/// refresh kicks in.
pub const REFRESH_SKEW_SECS: u64 = 30;

/// Random bytes in the state nonce (hex-encoded into the state value).
pub const STATE_NONCE_BYTES: usize = 16;

/// Random bytes in the PKCE code verifier before base64url encoding.
pub const VERIFIER_BYTES: usize = 64;
